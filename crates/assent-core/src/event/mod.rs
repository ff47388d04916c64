//! Chained events and pre-chain drafts.
//!
//! An [`Event`] is one immutable fact in a ledger: who did what, when, with
//! which payload, hash-linked to its predecessor. Events are never updated
//! or deleted; a superseding act (for example [`ActKind::Revoke`]) is a new
//! event.
//!
//! An [`EventDraft`] is the same content before chaining: no hashes yet, no
//! position. Drafts are what callers build, what signers sign, and what the
//! ledger turns into events on append.

mod kind;

pub use kind::{ActKind, KindAttributes, TelemetryClass, UnknownActKind};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::clock;
use crate::notary::NotaryToken;

/// Role of the actor recording an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Presents material and records presentation-side acts.
    Presenter,
    /// The person the session is about; the one who agrees or revokes.
    Subject,
    /// Read-only reviewer of the record.
    Auditor,
}

/// Parse error for an unrecognized role name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown actor role: {0:?}")]
pub struct UnknownActorRole(pub String);

impl ActorRole {
    /// Stable snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Presenter => "presenter",
            Self::Subject => "subject",
            Self::Auditor => "auditor",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = UnknownActorRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "presenter" => Ok(Self::Presenter),
            "subject" => Ok(Self::Subject),
            "auditor" => Ok(Self::Auditor),
            other => Err(UnknownActorRole(other.to_string())),
        }
    }
}

/// One immutable, chained fact.
///
/// `curr_hash` commits to every content field plus `prev_hash`; `signature`
/// and `notarization` ride alongside the chain and are not part of the
/// hashed material (the signer commits to content independent of chain
/// position).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Free-form domain tag, for example `"consent"` or `"ui"`.
    pub domain: String,
    /// Act category.
    pub kind: ActKind,
    /// Actor identifier.
    pub actor: String,
    /// Actor's role in the session.
    pub role: ActorRole,
    /// Opaque payload; callers pre-encode binary as hex strings.
    pub payload: Map<String, Value>,
    /// RFC 3339 UTC timestamp, stored as the exact string that was hashed.
    pub at: String,
    /// Predecessor's `curr_hash`; `None` only for the first event.
    pub prev_hash: Option<String>,
    /// This event's chain digest, lowercase hex.
    pub curr_hash: String,
    /// Detached Ed25519 signature over the content map, hex.
    pub signature: Option<String>,
    /// External timestamp token, if the event was notarized.
    pub notarization: Option<NotaryToken>,
}

impl Event {
    /// The hashed/signed content fields as a JSON map.
    ///
    /// Exactly `{actor, at, domain, kind, payload, role}` — no hashes, no
    /// signature. The chain hasher embeds `prev_hash` into a copy of this
    /// map; the signing message is the canonical encoding of this map as-is.
    #[must_use]
    pub fn content_map(&self) -> Map<String, Value> {
        content_map(
            &self.domain,
            self.kind,
            &self.actor,
            self.role,
            &self.payload,
            &self.at,
        )
    }
}

/// Event content before chaining.
///
/// The timestamp is fixed at construction so that the bytes a signer commits
/// to are the bytes the ledger will hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Free-form domain tag.
    pub domain: String,
    /// Act category.
    pub kind: ActKind,
    /// Actor identifier.
    pub actor: String,
    /// Actor's role in the session.
    pub role: ActorRole,
    /// Opaque payload mapping.
    pub payload: Map<String, Value>,
    /// RFC 3339 UTC timestamp.
    pub at: String,
}

impl EventDraft {
    /// Creates a draft with an empty payload, timestamped now.
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        kind: ActKind,
        actor: impl Into<String>,
        role: ActorRole,
    ) -> Self {
        Self {
            domain: domain.into(),
            kind,
            actor: actor.into(),
            role,
            payload: Map::new(),
            at: clock::now_rfc3339(),
        }
    }

    /// Replaces the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Adds one payload entry.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn at(mut self, at: impl Into<String>) -> Self {
        self.at = at.into();
        self
    }

    /// The content fields as a JSON map; see [`Event::content_map`].
    #[must_use]
    pub fn content_map(&self) -> Map<String, Value> {
        content_map(
            &self.domain,
            self.kind,
            &self.actor,
            self.role,
            &self.payload,
            &self.at,
        )
    }

    /// Finalizes the draft into an event at a known chain position.
    #[must_use]
    pub fn into_event(self, prev_hash: Option<String>, curr_hash: String) -> Event {
        Event {
            domain: self.domain,
            kind: self.kind,
            actor: self.actor,
            role: self.role,
            payload: self.payload,
            at: self.at,
            prev_hash,
            curr_hash,
            signature: None,
            notarization: None,
        }
    }
}

fn content_map(
    domain: &str,
    kind: ActKind,
    actor: &str,
    role: ActorRole,
    payload: &Map<String, Value>,
    at: &str,
) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("domain".to_string(), Value::String(domain.to_string()));
    map.insert("kind".to_string(), Value::String(kind.as_str().to_string()));
    map.insert("actor".to_string(), Value::String(actor.to_string()));
    map.insert("role".to_string(), Value::String(role.as_str().to_string()));
    map.insert("payload".to_string(), Value::Object(payload.clone()));
    map.insert("at".to_string(), Value::String(at.to_string()));
    map
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn draft() -> EventDraft {
        EventDraft::new("consent", ActKind::Agree, "subject-1", ActorRole::Subject)
            .with_field("form", json!("v3"))
            .at("2026-08-01T10:00:00.000000Z")
    }

    #[test]
    fn test_content_map_excludes_chain_fields() {
        let map = draft().content_map();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert!(keys.contains(&"domain"));
        assert!(keys.contains(&"at"));
        assert!(!keys.contains(&"prev_hash"));
        assert!(!keys.contains(&"curr_hash"));
        assert!(!keys.contains(&"signature"));
    }

    #[test]
    fn test_event_and_draft_content_agree() {
        let d = draft();
        let event = d.clone().into_event(None, "unchecked".to_string());
        assert_eq!(event.content_map(), d.content_map());
    }

    #[test]
    fn test_kind_and_role_serialize_as_wire_names() {
        let map = draft().content_map();
        assert_eq!(map["kind"], json!("agree"));
        assert_eq!(map["role"], json!("subject"));
    }

    #[test]
    fn test_role_parse_roundtrip() {
        for role in [ActorRole::Presenter, ActorRole::Subject, ActorRole::Auditor] {
            assert_eq!(role.as_str().parse::<ActorRole>().unwrap(), role);
        }
        assert!("nurse".parse::<ActorRole>().is_err());
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let event = draft().into_event(None, "deadbeef".to_string());
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_new_draft_is_timestamped() {
        let d = EventDraft::new("ui", ActKind::Present, "presenter-1", ActorRole::Presenter);
        assert!(chrono::DateTime::parse_from_rfc3339(&d.at).is_ok());
    }
}
