//! Ordered event storage interface.
//!
//! The ledger delegates durability to an [`EventStore`]: anything that can
//! append records, list them in insertion order, and report the most recent
//! chain hash. [`MemoryStore`] is the in-process implementation; the SQLite
//! store lives in [`super::sqlite`].

use thiserror::Error;

use crate::event::Event;

/// Errors from the storage layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded back into an event.
    #[error("corrupt event at seq {seq}: {detail}")]
    Corrupt {
        /// Sequence number of the undecodable row.
        seq: u64,
        /// What failed to decode.
        detail: String,
    },
}

/// Insertion-ordered event storage consumed by the ledger.
///
/// Implementations must preserve append order exactly; the chain invariant
/// is meaningless over a reordered sequence. Nothing here verifies hashes —
/// integrity checking is the verifier's job.
pub trait EventStore {
    /// Appends one event after all existing events.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the event cannot be persisted; the store
    /// must be unchanged in that case.
    fn append(&mut self, event: Event) -> Result<(), StoreError>;

    /// All events in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if stored records cannot be read or decoded.
    fn load(&self) -> Result<Vec<Event>, StoreError>;

    /// The most recent event's `curr_hash`, or `None` when empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on read failure.
    fn latest_hash(&self) -> Result<Option<String>, StoreError>;

    /// Number of stored events.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on read failure.
    fn len(&self) -> Result<usize, StoreError>;

    /// Whether the store holds no events.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on read failure.
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// Vec-backed store. Infallible; the default for tests and short-lived
/// sessions whose durability comes from capsule export.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    events: Vec<Event>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct mutable access to stored events.
    ///
    /// Bypasses the append-only discipline; exists so corruption tests can
    /// tamper with committed records. Ordinary callers have no reason to
    /// touch this.
    pub fn events_mut(&mut self) -> &mut [Event] {
        &mut self.events
    }
}

impl EventStore for MemoryStore {
    fn append(&mut self, event: Event) -> Result<(), StoreError> {
        self.events.push(event);
        Ok(())
    }

    fn load(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.events.clone())
    }

    fn latest_hash(&self) -> Result<Option<String>, StoreError> {
        Ok(self.events.last().map(|e| e.curr_hash.clone()))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.events.len())
    }
}
