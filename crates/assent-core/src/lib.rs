//! Tamper-evident, append-only consent ledger.
//!
//! `assent-core` maintains a hash-chained record of discrete
//! understanding/consent events so that any later alteration, reordering,
//! or deletion of history is detectable — a miniature transparency log with
//! a single trusted writer per ledger.
//!
//! # Architecture
//!
//! - [`canonical`] — deterministic JSON encoding; the hashing input for
//!   everything else.
//! - [`crypto`] — SHA-256 chain hashing, Ed25519 signing, and the
//!   latest-wins actor key registry.
//! - [`event`] — the immutable chained [`event::Event`], pre-chain drafts,
//!   and the closed [`event::ActKind`] vocabulary with its per-kind policy
//!   table.
//! - [`ledger`] — the append-only state machine: chained appends, one-way
//!   sealing, attested appends, export/import over a pluggable store.
//! - [`binder`] — signature policy and verification for high-consequence
//!   acts.
//! - [`notary`] — the synchronous external-timestamp seam.
//! - [`capsule`] — portable, losslessly serializable ledger snapshots.
//! - [`verify`] — stateless forensic verification reporting every
//!   discrepancy, never just the first.
//!
//! # Example
//!
//! ```
//! use assent_core::binder::sign_event;
//! use assent_core::crypto::keys::{KeyRegistry, MemoryKeyRegistry};
//! use assent_core::crypto::sign::generate_signing_key;
//! use assent_core::event::{ActKind, ActorRole, EventDraft};
//! use assent_core::ledger::{Ledger, MemoryStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = MemoryKeyRegistry::new();
//! let key = generate_signing_key();
//! registry.register("subject-1", key.verifying_key().as_bytes())?;
//!
//! let mut ledger = Ledger::new("session-1", MemoryStore::new()).with_subject("subject-1");
//! ledger.append(EventDraft::new(
//!     "consent",
//!     ActKind::Present,
//!     "presenter-1",
//!     ActorRole::Presenter,
//! ))?;
//!
//! // Agreement is high-consequence: it must arrive signed.
//! let agree = EventDraft::new("consent", ActKind::Agree, "subject-1", ActorRole::Subject);
//! let signature = sign_event(&agree, &key)?;
//! ledger.append_attested(agree, &signature, &registry, None)?;
//!
//! ledger.seal(None)?;
//! assert!(ledger.verify()?.ok());
//!
//! // The capsule travels; verification stays independent.
//! let capsule = ledger.export()?;
//! assert!(capsule.verify().ok());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod binder;
pub mod canonical;
pub mod capsule;
mod clock;
pub mod crypto;
pub mod event;
pub mod ledger;
pub mod notary;
pub mod verify;

pub use binder::{AttestationPolicy, BindError};
pub use canonical::EncodingError;
pub use capsule::{Capsule, CapsuleError};
pub use crypto::hash::EMPTY_ROOT;
pub use crypto::keys::{ActorKey, KeyRegistry, MemoryKeyRegistry};
pub use event::{ActKind, ActorRole, Event, EventDraft, KindAttributes, TelemetryClass};
pub use ledger::{
    EventStore, Ledger, LedgerError, MemoryStore, SignatureRecord, SqliteStore, StoreError,
};
pub use notary::{Notary, NotaryToken, SystemNotary};
pub use verify::{Problem, VerifyReport};
