//! `SQLite`-backed event store.
//!
//! Events land in a single `events` table keyed by a monotonically
//! increasing `seq`, with WAL mode enabled so verification reads can run
//! while an append is in flight. The store persists and orders; it never
//! interprets hashes — structural decode failures surface as
//! [`StoreError::Corrupt`], integrity failures are the verifier's job.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, params};
use serde_json::{Map, Value};
use tracing::debug;

use super::store::{EventStore, StoreError};
use crate::event::Event;
use crate::notary::NotaryToken;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

const SELECT_COLUMNS: &str =
    "seq, domain, kind, actor, role, payload, at, prev_hash, curr_hash, signature, notarization";

/// Durable event store over one `SQLite` database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or the
    /// schema cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        debug!(path = %path.display(), "opened sqlite event store");
        Ok(Self { conn })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the schema cannot be applied.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<(u64, RawRow)> {
        Ok((
            row.get::<_, i64>(0)?.unsigned_abs(),
            RawRow {
                domain: row.get(1)?,
                kind: row.get(2)?,
                actor: row.get(3)?,
                role: row.get(4)?,
                payload: row.get(5)?,
                at: row.get(6)?,
                prev_hash: row.get(7)?,
                curr_hash: row.get(8)?,
                signature: row.get(9)?,
                notarization: row.get(10)?,
            },
        ))
    }
}

/// Textual row form, decoded into an [`Event`] after the query.
struct RawRow {
    domain: String,
    kind: String,
    actor: String,
    role: String,
    payload: String,
    at: String,
    prev_hash: Option<String>,
    curr_hash: String,
    signature: Option<String>,
    notarization: Option<String>,
}

impl RawRow {
    fn decode(self, seq: u64) -> Result<Event, StoreError> {
        let corrupt = |detail: String| StoreError::Corrupt { seq, detail };

        let kind = self
            .kind
            .parse()
            .map_err(|e| corrupt(format!("kind: {e}")))?;
        let role = self
            .role
            .parse()
            .map_err(|e| corrupt(format!("role: {e}")))?;
        let payload: Map<String, Value> = serde_json::from_str(&self.payload)
            .map_err(|e| corrupt(format!("payload: {e}")))?;
        let notarization: Option<NotaryToken> = self
            .notarization
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| corrupt(format!("notarization: {e}")))?;

        Ok(Event {
            domain: self.domain,
            kind,
            actor: self.actor,
            role,
            payload,
            at: self.at,
            prev_hash: self.prev_hash,
            curr_hash: self.curr_hash,
            signature: self.signature,
            notarization,
        })
    }
}

impl EventStore for SqliteStore {
    fn append(&mut self, event: Event) -> Result<(), StoreError> {
        let payload = Value::Object(event.payload).to_string();
        let notarization = event
            .notarization
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                seq: 0,
                detail: format!("notarization: {e}"),
            })?;

        self.conn.execute(
            "INSERT INTO events (domain, kind, actor, role, payload, at, prev_hash, curr_hash, signature, notarization)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.domain,
                event.kind.as_str(),
                event.actor,
                event.role.as_str(),
                payload,
                event.at,
                event.prev_hash,
                event.curr_hash,
                event.signature,
                notarization,
            ],
        )?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<Event>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM events ORDER BY seq ASC"
        ))?;
        let rows = stmt
            .query_map([], Self::row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(seq, raw)| raw.decode(seq))
            .collect()
    }

    fn latest_hash(&self) -> Result<Option<String>, StoreError> {
        use rusqlite::OptionalExtension;
        let hash = self
            .conn
            .query_row(
                "SELECT curr_hash FROM events ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count.unsigned_abs() as usize)
    }
}
