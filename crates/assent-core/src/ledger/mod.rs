//! The append-only, hash-chained consent ledger.
//!
//! A [`Ledger`] owns an ordered [`EventStore`] and enforces the chain
//! invariant over it: every appended event's `prev_hash` is the previous
//! event's `curr_hash`, and `curr_hash` commits to the event's full content
//! plus that link. Events are immutable once appended; history is only ever
//! extended, never rewritten — a change of mind is a new superseding event.
//!
//! High-consequence act kinds (per the ledger's [`AttestationPolicy`]) must
//! arrive through [`Ledger::append_attested`], which verifies the actor's
//! signature before anything is written and records a [`SignatureRecord`]
//! atomically alongside the event.
//!
//! One logical writer per ledger: mutation takes `&mut self`, reads take
//! `&self`, and there is no internal locking. Callers sharing a ledger
//! across threads serialize externally.
//!
//! # Example
//!
//! ```
//! use assent_core::event::{ActKind, ActorRole, EventDraft};
//! use assent_core::ledger::{Ledger, MemoryStore};
//!
//! # fn example() -> Result<(), assent_core::ledger::LedgerError> {
//! let mut ledger = Ledger::new("session-1", MemoryStore::new());
//! let draft = EventDraft::new("consent", ActKind::Present, "presenter-1", ActorRole::Presenter);
//! let event = ledger.append(draft)?;
//! assert!(event.prev_hash.is_none());
//!
//! ledger.seal(None)?;
//! assert!(ledger.verify()?.ok());
//! # Ok(())
//! # }
//! ```

mod sqlite;
mod store;

#[cfg(test)]
mod tests;

pub use sqlite::SqliteStore;
pub use store::{EventStore, MemoryStore, StoreError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::binder::{self, AttestationPolicy, BindError};
use crate::canonical::EncodingError;
use crate::capsule::{self, Capsule};
use crate::clock;
use crate::crypto::hash::{self, EMPTY_ROOT};
use crate::crypto::keys::KeyRegistry;
use crate::event::{ActKind, Event, EventDraft};
use crate::notary::NotaryToken;
use crate::verify::{self, VerifyReport};

/// Errors from ledger operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Mutation was attempted after sealing. Terminal; not retried.
    #[error("ledger {id:?} is sealed")]
    Sealed {
        /// The sealed ledger's id.
        id: String,
    },

    /// The draft's kind requires attestation under this ledger's policy and
    /// must go through [`Ledger::append_attested`].
    #[error("act kind {kind} requires signature-backed attestation")]
    AttestationRequired {
        /// The kind that was submitted unsigned.
        kind: ActKind,
    },

    /// Import input is structurally incomplete or inconsistent.
    #[error("malformed ledger input: {detail}")]
    Malformed {
        /// What was rejected.
        detail: String,
    },

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Event content could not be canonically encoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Signature verification failed during an attested append.
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Bookkeeping for one verified attestation.
///
/// Created atomically with the event it attests. Carries a snapshot of the
/// verifying key the signature was checked against, because the key registry
/// is latest-wins and keeps no history — without the snapshot, a key
/// rotation would orphan every earlier signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// `curr_hash` of the attested event.
    pub event_hash: String,
    /// The signing actor.
    pub actor: String,
    /// The verified signature, hex.
    pub signature: String,
    /// Hex of the key the signature was verified against.
    pub verifying_key: String,
    /// External timestamp token, when the attestation was notarized.
    pub notarization: Option<NotaryToken>,
    /// RFC 3339 record creation time.
    pub created_at: String,
}

/// Append-only hash-chained event ledger over a pluggable store.
pub struct Ledger<S: EventStore> {
    id: String,
    subject_ref: Option<String>,
    context: Map<String, Value>,
    store: S,
    sealed: bool,
    root: Option<String>,
    policy: AttestationPolicy,
    signature_records: Vec<SignatureRecord>,
}

impl<S: EventStore> Ledger<S> {
    /// Creates an active ledger with the default attestation policy.
    #[must_use]
    pub fn new(id: impl Into<String>, store: S) -> Self {
        Self {
            id: id.into(),
            subject_ref: None,
            context: Map::new(),
            store,
            sealed: false,
            root: None,
            policy: AttestationPolicy::default(),
            signature_records: Vec::new(),
        }
    }

    /// Sets the subject reference.
    #[must_use]
    pub fn with_subject(mut self, subject_ref: impl Into<String>) -> Self {
        self.subject_ref = Some(subject_ref.into());
        self
    }

    /// Sets the free-form context metadata.
    #[must_use]
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// Replaces the attestation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AttestationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ledger identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subject reference, when known.
    #[must_use]
    pub fn subject_ref(&self) -> Option<&str> {
        self.subject_ref.as_deref()
    }

    /// Context metadata.
    #[must_use]
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Whether the ledger has been sealed.
    #[must_use]
    pub fn sealed(&self) -> bool {
        self.sealed
    }

    /// Chain root fixed at seal time; `None` while active.
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// The active attestation policy.
    #[must_use]
    pub fn policy(&self) -> &AttestationPolicy {
        &self.policy
    }

    /// Signature records, in creation order.
    #[must_use]
    pub fn signature_records(&self) -> &[SignatureRecord] {
        &self.signature_records
    }

    /// All events in chain order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] on read failure.
    pub fn events(&self) -> Result<Vec<Event>, LedgerError> {
        Ok(self.store.load()?)
    }

    /// Number of appended events.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] on read failure.
    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.store.len()?)
    }

    /// Whether no event has been appended.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] on read failure.
    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.store.is_empty()?)
    }

    /// Mutable access to the backing store.
    ///
    /// Corruption tests use this to tamper with committed events and then
    /// observe `verify` reporting it; ordinary callers have no reason to
    /// reach past the ledger.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Appends an unsigned event.
    ///
    /// Everything fallible happens before the store is touched, so the
    /// append either fully commits or leaves no observable change.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Sealed`] post-seal; [`LedgerError::AttestationRequired`]
    /// if the kind needs a signature under this ledger's policy;
    /// [`LedgerError::Encoding`] for unencodable payloads;
    /// [`LedgerError::Store`] if persisting fails.
    pub fn append(&mut self, draft: EventDraft) -> Result<Event, LedgerError> {
        self.ensure_active()?;
        if self.policy.requires(draft.kind) {
            return Err(LedgerError::AttestationRequired { kind: draft.kind });
        }
        self.chain_and_store(draft, None, None)
    }

    /// Verifies a signature over the draft, then appends the event with the
    /// signature (and optional notarization token) attached, recording a
    /// [`SignatureRecord`] atomically alongside it.
    ///
    /// Verification happens strictly before any mutation: a failed check
    /// leaves the ledger completely unmodified.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Sealed`] post-seal; [`LedgerError::Bind`] when the
    /// actor has no registered key or the signature does not verify;
    /// [`LedgerError::Store`] if persisting fails.
    pub fn append_attested(
        &mut self,
        draft: EventDraft,
        signature_hex: &str,
        registry: &dyn KeyRegistry,
        notarization: Option<NotaryToken>,
    ) -> Result<Event, LedgerError> {
        self.ensure_active()?;
        let verifying_key = binder::verify_attestation(&draft, signature_hex, registry)?;

        let actor = draft.actor.clone();
        let event = self.chain_and_store(
            draft,
            Some(signature_hex.to_string()),
            notarization.clone(),
        )?;

        self.signature_records.push(SignatureRecord {
            event_hash: event.curr_hash.clone(),
            actor,
            signature: signature_hex.to_string(),
            verifying_key,
            notarization,
            created_at: clock::now_rfc3339(),
        });
        Ok(event)
    }

    /// Seals the ledger, fixing the chain root. Idempotent; a second call
    /// is a no-op and ignores its attestation.
    ///
    /// The root becomes the last event's `curr_hash`, or the digest of the
    /// empty byte string when no event was appended. An attestation, when
    /// given, is appended to the reserved `attestations` context array.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if the head hash cannot be read; the
    /// ledger stays unsealed in that case.
    pub fn seal(&mut self, attestation: Option<Value>) -> Result<(), LedgerError> {
        if self.sealed {
            return Ok(());
        }
        let root = self
            .store
            .latest_hash()?
            .unwrap_or_else(|| EMPTY_ROOT.to_string());
        if let Some(attestation) = attestation {
            capsule::record_attestation(&mut self.context, attestation);
        }
        info!(ledger = %self.id, root = %root, "sealed ledger");
        self.root = Some(root);
        self.sealed = true;
        Ok(())
    }

    /// Forensic chain verification: every link recomputed, every mismatch
    /// reported, plus the root check when sealed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] only if events cannot be read at all;
    /// integrity findings are data in the report, never errors.
    pub fn verify(&self) -> Result<VerifyReport, LedgerError> {
        let events = self.store.load()?;
        Ok(verify::verify_sealed(
            &events,
            self.sealed,
            self.root.as_deref(),
        ))
    }

    /// Full audit: chain, root, and signature re-checks against the given
    /// registry, under this ledger's policy.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Ledger::verify`].
    pub fn verify_with_keys(
        &self,
        registry: &dyn KeyRegistry,
    ) -> Result<VerifyReport, LedgerError> {
        let events = self.store.load()?;
        Ok(verify::verify_with_keys(
            &events,
            self.sealed,
            self.root.as_deref(),
            &self.policy,
            registry,
        ))
    }

    /// Snapshots the ledger into a portable [`Capsule`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] on read failure.
    pub fn export(&self) -> Result<Capsule, LedgerError> {
        Ok(Capsule {
            ledger_id: self.id.clone(),
            subject_ref: self.subject_ref.clone(),
            context: self.context.clone(),
            sealed: self.sealed,
            root: self.root.clone(),
            events: self.store.load()?,
        })
    }

    /// Rebuilds a ledger from a capsule into an empty store.
    ///
    /// Structural validation only: events are stored exactly as carried,
    /// with no hash re-verification — run [`Ledger::verify`] explicitly to
    /// check integrity. Uses the default attestation policy; adjust with
    /// [`Ledger::with_policy`] afterwards if the original differed.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Malformed`] if the capsule has an empty id, is sealed
    /// without a root, or the target store already holds events;
    /// [`LedgerError::Store`] if persisting fails.
    pub fn import(capsule: Capsule, mut store: S) -> Result<Self, LedgerError> {
        if capsule.ledger_id.is_empty() {
            return Err(LedgerError::Malformed {
                detail: "empty ledger_id".to_string(),
            });
        }
        if capsule.sealed && capsule.root.is_none() {
            return Err(LedgerError::Malformed {
                detail: "sealed capsule has no root".to_string(),
            });
        }
        if !store.is_empty()? {
            return Err(LedgerError::Malformed {
                detail: "import target store is not empty".to_string(),
            });
        }

        for event in capsule.events {
            store.append(event)?;
        }

        debug!(ledger = %capsule.ledger_id, sealed = capsule.sealed, "imported capsule");
        Ok(Self {
            id: capsule.ledger_id,
            subject_ref: capsule.subject_ref,
            context: capsule.context,
            store,
            sealed: capsule.sealed,
            root: capsule.root,
            policy: AttestationPolicy::default(),
            signature_records: Vec::new(),
        })
    }

    fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.sealed {
            return Err(LedgerError::Sealed {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Computes the chain link and commits the event.
    ///
    /// Hash computation precedes the store call; the only remaining failure
    /// is the store's, which by its own contract leaves nothing behind.
    fn chain_and_store(
        &mut self,
        draft: EventDraft,
        signature: Option<String>,
        notarization: Option<NotaryToken>,
    ) -> Result<Event, LedgerError> {
        let prev_hash = self.store.latest_hash()?;
        let curr_hash = hash::chain_hash(&draft.content_map(), prev_hash.as_deref())?;

        let mut event = draft.into_event(prev_hash, curr_hash);
        event.signature = signature;
        event.notarization = notarization;

        self.store.append(event.clone())?;
        debug!(
            ledger = %self.id,
            kind = %event.kind,
            hash = %event.curr_hash,
            signed = event.signature.is_some(),
            "appended event"
        );
        Ok(event)
    }
}
