//! Actor key registry.
//!
//! Maps actor identifiers to their current Ed25519 verifying key. The
//! registry is deliberately latest-wins: re-registering an actor replaces
//! the previous key with no history kept here. Auditability across rotation
//! is preserved elsewhere, by the verifying-key snapshot on every signature
//! record.
//!
//! The registry is always injected at the call site (signature verification
//! takes `&dyn KeyRegistry`), never reached through a global.

use std::collections::BTreeMap;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sign::{self, KeyMaterialError};
use crate::clock;

/// A registered actor key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorKey {
    /// Actor this key belongs to.
    pub actor: String,
    /// Hex-encoded Ed25519 verifying key.
    pub public_key: String,
    /// RFC 3339 registration time.
    pub registered_at: String,
}

impl ActorKey {
    /// Parses the stored hex into a usable verifying key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError`] if the stored material is invalid, which
    /// can only happen if the registry was bypassed.
    pub fn verifying_key(&self) -> Result<VerifyingKey, KeyMaterialError> {
        sign::parse_verifying_key(&self.public_key)
    }
}

/// Lookup and registration surface consumed by signature verification.
pub trait KeyRegistry {
    /// Registers (or replaces) the key for an actor.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError`] if the key bytes are not a valid,
    /// non-weak Ed25519 public key. Rejected keys leave the registry
    /// unchanged.
    fn register(&mut self, actor: &str, public_key: &[u8]) -> Result<ActorKey, KeyMaterialError>;

    /// Returns the current key for an actor, if one is registered.
    fn lookup(&self, actor: &str) -> Option<&ActorKey>;

    /// All registered keys, ordered by actor id.
    fn list(&self) -> Vec<&ActorKey>;
}

/// In-memory registry, the default implementation.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyRegistry {
    keys: BTreeMap<String, ActorKey>,
}

impl MemoryKeyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no actor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyRegistry for MemoryKeyRegistry {
    fn register(&mut self, actor: &str, public_key: &[u8]) -> Result<ActorKey, KeyMaterialError> {
        let key = sign::validate_public_key(public_key)?;
        let entry = ActorKey {
            actor: actor.to_string(),
            public_key: sign::encode_verifying_key(&key),
            registered_at: clock::now_rfc3339(),
        };
        let replaced = self
            .keys
            .insert(actor.to_string(), entry.clone())
            .is_some();
        debug!(actor, replaced, "registered actor key");
        Ok(entry)
    }

    fn lookup(&self, actor: &str) -> Option<&ActorKey> {
        self.keys.get(actor)
    }

    fn list(&self) -> Vec<&ActorKey> {
        self.keys.values().collect()
    }
}
