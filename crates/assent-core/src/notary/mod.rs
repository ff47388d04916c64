//! External timestamp notarization.
//!
//! A [`Notary`] stamps a digest with an externally sourced timestamp. The
//! returned token is opaque to the ledger: it is attached to the event and
//! its signature record and carried through export, never interpreted.
//!
//! Notarization is an explicit, separately-callable step. It is never fused
//! into `append`, so a slow or failing timestamp source is the collaborator's
//! failure mode and can never retroactively un-append an event.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock;

/// An external timestamp attestation over a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryToken {
    /// Lowercase hex of the digest that was stamped.
    pub digest: String,
    /// RFC 3339 timestamp asserted by the notary.
    pub timestamp: String,
    /// Stamp identifier assigned by the notary.
    pub serial: String,
}

/// Synchronous timestamp collaborator.
///
/// Implementations must not retry or back off internally; callers decide
/// whether a stamp is worth waiting for.
pub trait Notary {
    /// Stamps a digest, returning the attestation token.
    fn notarize(&self, digest: &[u8]) -> NotaryToken;
}

/// Notary backed by the local system clock.
///
/// Suitable for deployments where the ledger host's clock is itself the
/// trusted time source. An RFC 3161 TSA client would implement [`Notary`]
/// the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNotary;

impl SystemNotary {
    /// Creates a system-clock notary.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notary for SystemNotary {
    fn notarize(&self, digest: &[u8]) -> NotaryToken {
        NotaryToken {
            digest: hex::encode(digest),
            timestamp: clock::now_rfc3339(),
            serial: Uuid::new_v4().to_string(),
        }
    }
}
