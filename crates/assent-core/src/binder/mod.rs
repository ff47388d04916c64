//! Signature binding for high-consequence acts.
//!
//! Which act kinds need a verified signature is policy data
//! ([`AttestationPolicy`]), injected into the ledger rather than hardcoded.
//! The signed message is the canonical encoding of the event's content map —
//! `{actor, at, domain, kind, payload, role}`, excluding both hashes and the
//! signature itself — so the signer commits to content independent of where
//! the event eventually lands in the chain.
//!
//! Verification is fail-closed and oracle-free: every cryptographic failure
//! (bad hex, wrong length, invalid point, mismatch) collapses to the single
//! [`BindError::Signature`] variant. Only the absence of a registered key is
//! distinguished, as [`BindError::UnknownActor`].

use std::collections::BTreeSet;

use ed25519_dalek::SigningKey;
use thiserror::Error;

use crate::canonical::{self, EncodingError};
use crate::crypto::keys::KeyRegistry;
use crate::crypto::sign;
use crate::event::{ActKind, EventDraft};

/// Errors from attestation verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BindError {
    /// No key is registered for the signing actor.
    #[error("no registered key for actor {actor:?}")]
    UnknownActor {
        /// The actor with no registered key.
        actor: String,
    },

    /// The signature did not verify.
    ///
    /// Deliberately cause-free: malformed bytes, wrong length, and honest
    /// mismatches are indistinguishable to the caller.
    #[error("signature verification failed")]
    Signature,

    /// The draft's content could not be canonically encoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// The set of act kinds that must carry a verified signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationPolicy {
    required: BTreeSet<ActKind>,
}

impl AttestationPolicy {
    /// Policy over an explicit set of kinds.
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = ActKind>) -> Self {
        Self {
            required: kinds.into_iter().collect(),
        }
    }

    /// Policy requiring nothing; every kind may be appended unsigned.
    #[must_use]
    pub fn none() -> Self {
        Self {
            required: BTreeSet::new(),
        }
    }

    /// Whether this policy requires a signature for `kind`.
    #[must_use]
    pub fn requires(&self, kind: ActKind) -> bool {
        self.required.contains(&kind)
    }
}

impl Default for AttestationPolicy {
    /// The kinds flagged `signature_required` in the [`ActKind`] attribute
    /// table.
    fn default() -> Self {
        Self::new(
            ActKind::ALL
                .into_iter()
                .filter(|kind| kind.signature_required()),
        )
    }
}

/// The exact bytes an actor signs for a draft.
///
/// # Errors
///
/// Returns [`EncodingError`] if the draft's payload cannot be canonically
/// encoded.
pub fn signing_message(draft: &EventDraft) -> Result<Vec<u8>, EncodingError> {
    canonical::canonical_bytes(&serde_json::Value::Object(draft.content_map()))
}

/// Signs a draft, returning the detached signature as hex.
///
/// Convenience for tests and in-process signers; production actors normally
/// sign [`signing_message`] bytes out of band and submit the hex.
///
/// # Errors
///
/// Returns [`EncodingError`] if the draft cannot be canonically encoded.
pub fn sign_event(draft: &EventDraft, key: &SigningKey) -> Result<String, EncodingError> {
    let message = signing_message(draft)?;
    Ok(sign::encode_signature(&sign::sign_message(key, &message)))
}

/// Verifies a signature over a draft against the actor's registered key.
///
/// Pure check: nothing is appended and no state changes. Returns the hex of
/// the verifying key that validated the signature, so callers can snapshot
/// it into the signature record (the registry is latest-wins and keeps no
/// history).
///
/// # Errors
///
/// [`BindError::UnknownActor`] if the draft's actor has no registered key;
/// [`BindError::Signature`] for any cryptographic failure;
/// [`BindError::Encoding`] if the draft cannot be canonically encoded.
pub fn verify_attestation(
    draft: &EventDraft,
    signature_hex: &str,
    registry: &dyn KeyRegistry,
) -> Result<String, BindError> {
    let actor_key = registry
        .lookup(&draft.actor)
        .ok_or_else(|| BindError::UnknownActor {
            actor: draft.actor.clone(),
        })?;

    let verifying_key = actor_key.verifying_key().map_err(|_| BindError::Signature)?;
    let signature = sign::parse_signature(signature_hex).map_err(|_| BindError::Signature)?;
    let message = signing_message(draft)?;

    if sign::verify_signature(&verifying_key, &message, &signature) {
        Ok(actor_key.public_key.clone())
    } else {
        Err(BindError::Signature)
    }
}
