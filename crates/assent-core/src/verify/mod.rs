//! Forensic chain and signature verification.
//!
//! Everything here is stateless and read-only: recompute every link from
//! stored fields and report EVERY discrepancy, never stopping at the first.
//! A finding is data ([`VerifyReport`]), not an error — audits are expected
//! to sometimes find problems, and callers need the complete list.
//!
//! Corruption cascades by construction: tampering with event `n`'s content
//! changes its recomputed digest, so the report names both `n`'s curr_hash
//! mismatch and `n+1`'s prev_hash mismatch.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::binder::{self, AttestationPolicy, BindError};
use crate::capsule::Capsule;
use crate::crypto::hash::{self, EMPTY_ROOT};
use crate::crypto::keys::KeyRegistry;
use crate::event::{Event, EventDraft};

/// One discrepancy found during verification.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Problem {
    /// An event's stored `prev_hash` does not match its predecessor's
    /// stored `curr_hash`.
    #[error("event[{index}] prev_hash mismatch")]
    PrevHashMismatch {
        /// Index of the event whose link is broken.
        index: usize,
        /// The predecessor's stored `curr_hash` (`None` at index 0).
        expected: Option<String>,
        /// The `prev_hash` the event actually stores.
        stored: Option<String>,
    },

    /// An event's stored `curr_hash` does not match the digest recomputed
    /// from its stored fields.
    #[error("event[{index}] curr_hash mismatch")]
    CurrHashMismatch {
        /// Index of the altered event.
        index: usize,
        /// Digest recomputed from the stored fields.
        expected: String,
        /// The `curr_hash` the event actually stores.
        stored: String,
    },

    /// A sealed root does not match the final event's stored `curr_hash`.
    #[error("root mismatch")]
    RootMismatch {
        /// The final stored `curr_hash` (or the empty root).
        expected: String,
        /// The root actually recorded at seal time.
        stored: Option<String>,
    },

    /// An event's stored content cannot be canonically encoded, so its
    /// digest cannot even be recomputed.
    #[error("event[{index}] content not canonically encodable: {detail}")]
    Unencodable {
        /// Index of the undecodable event.
        index: usize,
        /// The encoding failure.
        detail: String,
    },

    /// Policy requires a signature for this event's kind, but none is
    /// stored.
    #[error("event[{index}] requires a signature but carries none")]
    MissingSignature {
        /// Index of the unsigned event.
        index: usize,
    },

    /// A stored signature does not verify against the actor's currently
    /// registered key.
    #[error("event[{index}] signature invalid")]
    SignatureInvalid {
        /// Index of the event with the failing signature.
        index: usize,
    },

    /// A signed event's actor has no registered key.
    #[error("event[{index}] signer {actor:?} has no registered key")]
    UnknownActor {
        /// Index of the orphaned signature.
        index: usize,
        /// The actor with no key.
        actor: String,
    },
}

impl Problem {
    /// The event index this problem refers to, if it names one.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::PrevHashMismatch { index, .. }
            | Self::CurrHashMismatch { index, .. }
            | Self::Unencodable { index, .. }
            | Self::MissingSignature { index }
            | Self::SignatureInvalid { index }
            | Self::UnknownActor { index, .. } => Some(*index),
            Self::RootMismatch { .. } => None,
        }
    }
}

/// Complete result of one verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Every discrepancy found, in event order.
    pub problems: Vec<Problem>,
}

impl VerifyReport {
    /// Whether no problem was found.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.problems.is_empty()
    }

    fn push(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    fn log_outcome(self, scope: &str) -> Self {
        if !self.ok() {
            warn!(scope, problems = self.problems.len(), "verification found problems");
        }
        self
    }
}

/// Verifies the chain invariant over an ordered event slice.
///
/// Checks, for every event, that the stored `curr_hash` equals the digest
/// recomputed from the stored fields, and that the stored `prev_hash` links
/// to the predecessor — both to its stored digest and to its recomputed one.
/// Reports everything it finds.
#[must_use]
pub fn verify_events(events: &[Event]) -> VerifyReport {
    let mut report = VerifyReport::default();
    check_chain(events, &mut report);
    report.log_outcome("events")
}

/// Verifies the chain invariant plus, when sealed, the recorded root.
#[must_use]
pub fn verify_sealed(events: &[Event], sealed: bool, root: Option<&str>) -> VerifyReport {
    let mut report = VerifyReport::default();
    check_chain(events, &mut report);
    if sealed {
        check_root(events, root, &mut report);
    }
    report.log_outcome("sealed")
}

/// Verifies a capsule: chain plus root when sealed.
#[must_use]
pub fn verify_capsule(capsule: &Capsule) -> VerifyReport {
    verify_sealed(&capsule.events, capsule.sealed, capsule.root.as_deref())
}

/// Full audit: chain, root, and signature re-checks.
///
/// Every event carrying a signature is re-verified against the actor's key
/// as registered right now; events whose kind requires a signature under
/// `policy` but carry none are reported as [`Problem::MissingSignature`].
/// Signatures are checked against the registry's current keys, so a rotation
/// since append legitimately surfaces as [`Problem::SignatureInvalid`] —
/// auditors needing the original key use the ledger's signature records.
#[must_use]
pub fn verify_with_keys(
    events: &[Event],
    sealed: bool,
    root: Option<&str>,
    policy: &AttestationPolicy,
    registry: &dyn KeyRegistry,
) -> VerifyReport {
    let mut report = VerifyReport::default();
    check_chain(events, &mut report);
    if sealed {
        check_root(events, root, &mut report);
    }

    for (index, event) in events.iter().enumerate() {
        match &event.signature {
            None => {
                if policy.requires(event.kind) {
                    report.push(Problem::MissingSignature { index });
                }
            },
            Some(signature) => {
                let draft = EventDraft {
                    domain: event.domain.clone(),
                    kind: event.kind,
                    actor: event.actor.clone(),
                    role: event.role,
                    payload: event.payload.clone(),
                    at: event.at.clone(),
                };
                match binder::verify_attestation(&draft, signature, registry) {
                    Ok(_) => {},
                    Err(BindError::UnknownActor { actor }) => {
                        report.push(Problem::UnknownActor { index, actor });
                    },
                    Err(BindError::Signature) => {
                        report.push(Problem::SignatureInvalid { index });
                    },
                    Err(BindError::Encoding(e)) => {
                        report.push(Problem::Unencodable {
                            index,
                            detail: e.to_string(),
                        });
                    },
                }
            },
        }
    }

    report.log_outcome("with_keys")
}

/// Walks the chain, comparing each link against the predecessor's stored
/// digest AND its recomputed digest.
///
/// The double comparison is what makes corruption cascade: altering event
/// `n`'s content leaves its stored `curr_hash` (and therefore `n+1`'s stored
/// link) textually consistent, but the recomputed digest no longer matches,
/// so `n+1`'s prev_hash check fails too.
fn check_chain(events: &[Event], report: &mut VerifyReport) {
    let mut prior_stored: Option<String> = None;
    let mut prior_recomputed: Option<String> = None;

    for (index, event) in events.iter().enumerate() {
        let stored_prev = event.prev_hash.as_deref();

        let stored_ok = optional_digests_match(stored_prev, prior_stored.as_deref());
        let recomputed_ok = match (index, prior_recomputed.as_deref()) {
            // Genesis has no predecessor; an unencodable predecessor has
            // already been reported on its own index.
            (0, _) | (_, None) => true,
            (_, Some(h)) => stored_prev.is_some_and(|p| hash::digests_match(p, h)),
        };
        if !(stored_ok && recomputed_ok) {
            let expected = if stored_ok {
                prior_recomputed.clone()
            } else {
                prior_stored.clone()
            };
            report.push(Problem::PrevHashMismatch {
                index,
                expected,
                stored: event.prev_hash.clone(),
            });
        }

        match hash::chain_hash(&event.content_map(), stored_prev) {
            Ok(expected) => {
                if !hash::digests_match(&expected, &event.curr_hash) {
                    report.push(Problem::CurrHashMismatch {
                        index,
                        expected: expected.clone(),
                        stored: event.curr_hash.clone(),
                    });
                }
                prior_recomputed = Some(expected);
            },
            Err(e) => {
                report.push(Problem::Unencodable {
                    index,
                    detail: e.to_string(),
                });
                prior_recomputed = None;
            },
        }

        prior_stored = Some(event.curr_hash.clone());
    }
}

fn check_root(events: &[Event], root: Option<&str>, report: &mut VerifyReport) {
    let expected = events.last().map_or(EMPTY_ROOT, |e| e.curr_hash.as_str());
    let matches = root.is_some_and(|stored| hash::digests_match(stored, expected));
    if !matches {
        report.push(Problem::RootMismatch {
            expected: expected.to_string(),
            stored: root.map(String::from),
        });
    }
}

fn optional_digests_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => hash::digests_match(a, b),
        _ => false,
    }
}
