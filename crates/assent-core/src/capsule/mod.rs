//! Portable ledger snapshots.
//!
//! A [`Capsule`] is the flat, self-contained form of a ledger: identity,
//! subject/context metadata, seal state, and the full event sequence. It is
//! what crosses process boundaries — handed to auditors, archived, or
//! re-imported into a fresh ledger — and it round-trips losslessly through
//! JSON.
//!
//! Deserialization checks structure only. A capsule that parses may still
//! be a forgery; cryptographic integrity is always a separate, explicit
//! [`Capsule::verify`] call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::crypto::hash::EMPTY_ROOT;
use crate::event::Event;
use crate::verify::{self, VerifyReport};

/// Reserved context key that seal attestations are collected under.
pub(crate) const ATTESTATIONS_KEY: &str = "attestations";

/// Errors from capsule serialization.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CapsuleError {
    /// The input is not a structurally complete capsule.
    #[error("malformed capsule: {detail}")]
    Malformed {
        /// What the parser rejected.
        detail: String,
    },
}

/// A named, tamper-evident snapshot of one ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    /// Identity of the ledger this snapshot was taken from.
    pub ledger_id: String,
    /// Who the session is about, when known.
    pub subject_ref: Option<String>,
    /// Free-form context metadata carried alongside the chain.
    pub context: Map<String, Value>,
    /// Whether the ledger was sealed at snapshot time.
    pub sealed: bool,
    /// Chain root fixed at seal time; `None` while unsealed.
    pub root: Option<String>,
    /// The full event sequence, in chain order.
    pub events: Vec<Event>,
}

impl Capsule {
    /// Creates an empty, unsealed capsule.
    #[must_use]
    pub fn new(ledger_id: impl Into<String>) -> Self {
        Self {
            ledger_id: ledger_id.into(),
            subject_ref: None,
            context: Map::new(),
            sealed: false,
            root: None,
            events: Vec::new(),
        }
    }

    /// Seals the capsule, fixing its root. Idempotent; a second call is a
    /// no-op and ignores its attestation.
    ///
    /// The root becomes the last event's `curr_hash`, or the digest of the
    /// empty byte string when there are no events. An attestation, when
    /// given, is appended to the reserved `attestations` context array.
    pub fn seal(&mut self, attestation: Option<Value>) {
        if self.sealed {
            return;
        }
        self.root = Some(
            self.events
                .last()
                .map_or_else(|| EMPTY_ROOT.to_string(), |e| e.curr_hash.clone()),
        );
        if let Some(attestation) = attestation {
            record_attestation(&mut self.context, attestation);
        }
        self.sealed = true;
    }

    /// Full forensic verification: chain plus root when sealed.
    #[must_use]
    pub fn verify(&self) -> VerifyReport {
        verify::verify_capsule(self)
    }

    /// Compact JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Malformed`] only if an event payload cannot
    /// be represented, which cannot happen for payloads built from JSON.
    pub fn to_json(&self) -> Result<String, CapsuleError> {
        serde_json::to_string(self).map_err(|e| CapsuleError::Malformed {
            detail: e.to_string(),
        })
    }

    /// Human-readable JSON form.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Capsule::to_json`].
    pub fn to_json_pretty(&self) -> Result<String, CapsuleError> {
        serde_json::to_string_pretty(self).map_err(|e| CapsuleError::Malformed {
            detail: e.to_string(),
        })
    }

    /// Parses a capsule from JSON, checking structure only.
    ///
    /// Hashes and signatures are NOT re-verified here; call
    /// [`Capsule::verify`] separately so structural validity and
    /// cryptographic integrity stay independently testable.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Malformed`] for anything that is not a
    /// structurally complete capsule, including a sealed capsule with no
    /// root.
    pub fn from_json(json: &str) -> Result<Self, CapsuleError> {
        let capsule: Self = serde_json::from_str(json).map_err(|e| CapsuleError::Malformed {
            detail: e.to_string(),
        })?;
        if capsule.sealed && capsule.root.is_none() {
            return Err(CapsuleError::Malformed {
                detail: "sealed capsule has no root".to_string(),
            });
        }
        Ok(capsule)
    }
}

/// Appends an attestation to the reserved context array, creating it on
/// first use.
pub(crate) fn record_attestation(context: &mut Map<String, Value>, attestation: Value) {
    match context.get_mut(ATTESTATIONS_KEY) {
        Some(Value::Array(items)) => items.push(attestation),
        _ => {
            context.insert(
                ATTESTATIONS_KEY.to_string(),
                Value::Array(vec![attestation]),
            );
        },
    }
}
