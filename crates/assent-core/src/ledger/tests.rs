//! Ledger state machine tests: chaining, sealing, attestation, round-trips.

use serde_json::json;

use super::*;
use crate::binder::sign_event;
use crate::crypto::keys::MemoryKeyRegistry;
use crate::crypto::sign::generate_signing_key;
use crate::event::ActorRole;
use crate::notary::{Notary, SystemNotary};
use crate::verify::Problem;

fn draft(kind: ActKind, step: i64) -> EventDraft {
    EventDraft::new("consent", kind, "subject-1", ActorRole::Subject)
        .with_field("step", json!(step))
}

fn ledger() -> Ledger<MemoryStore> {
    Ledger::new("session-1", MemoryStore::new()).with_subject("subject-1")
}

/// Registry with a key for subject-1; returns the signing key too.
fn registry_with_subject() -> (MemoryKeyRegistry, ed25519_dalek::SigningKey) {
    let mut registry = MemoryKeyRegistry::new();
    let key = generate_signing_key();
    registry
        .register("subject-1", key.verifying_key().as_bytes())
        .unwrap();
    (registry, key)
}

// =========================================================================
// Chaining
// =========================================================================

#[test]
fn test_append_links_events_in_order() {
    let mut ledger = ledger();
    let a = ledger.append(draft(ActKind::Present, 0)).unwrap();
    let b = ledger.append(draft(ActKind::ClarifyRequest, 1)).unwrap();
    let c = ledger.append(draft(ActKind::AckSummary, 2)).unwrap();

    assert_eq!(a.prev_hash, None);
    assert_eq!(b.prev_hash.as_deref(), Some(a.curr_hash.as_str()));
    assert_eq!(c.prev_hash.as_deref(), Some(b.curr_hash.as_str()));
    assert_eq!(ledger.len().unwrap(), 3);
}

#[test]
fn test_stored_hash_is_reproducible() {
    let mut ledger = ledger();
    let event = ledger.append(draft(ActKind::Present, 0)).unwrap();
    let recomputed = hash::chain_hash(&event.content_map(), event.prev_hash.as_deref()).unwrap();
    assert_eq!(recomputed, event.curr_hash);
}

#[test]
fn test_unencodable_payload_leaves_no_trace() {
    let mut ledger = ledger();
    let bad = draft(ActKind::Present, 0).with_field("score", json!(0.5));
    assert!(matches!(
        ledger.append(bad),
        Err(LedgerError::Encoding(_))
    ));
    assert!(ledger.is_empty().unwrap());
}

#[test]
fn test_verify_ok_on_untouched_ledger() {
    let mut ledger = ledger();
    for n in 0..3 {
        ledger.append(draft(ActKind::Present, n)).unwrap();
    }
    let report = ledger.verify().unwrap();
    assert!(report.ok());
    assert!(report.problems.is_empty());
}

#[test]
fn test_tamper_in_store_cascades() {
    let mut ledger = ledger();
    for n in 0..3 {
        ledger.append(draft(ActKind::Present, n)).unwrap();
    }
    ledger.seal(None).unwrap();

    // Bypass the API and corrupt the middle event's payload in storage.
    ledger.store_mut().events_mut()[1]
        .payload
        .insert("step".to_string(), json!(99));

    let report = ledger.verify().unwrap();
    assert!(!report.ok());
    assert!(report
        .problems
        .iter()
        .any(|p| matches!(p, Problem::CurrHashMismatch { index: 1, .. })));
    assert!(report
        .problems
        .iter()
        .any(|p| matches!(p, Problem::PrevHashMismatch { index: 2, .. })));
}

// =========================================================================
// Sealing
// =========================================================================

#[test]
fn test_seal_sets_root_to_last_hash() {
    let mut ledger = ledger();
    ledger.append(draft(ActKind::Present, 0)).unwrap();
    let last = ledger.append(draft(ActKind::AckSummary, 1)).unwrap();

    ledger.seal(None).unwrap();
    assert!(ledger.sealed());
    assert_eq!(ledger.root(), Some(last.curr_hash.as_str()));
    assert!(ledger.verify().unwrap().ok());
}

#[test]
fn test_seal_empty_ledger_uses_empty_root() {
    let mut ledger = ledger();
    ledger.seal(None).unwrap();
    assert_eq!(ledger.root(), Some(EMPTY_ROOT));
    assert!(ledger.verify().unwrap().ok());
}

#[test]
fn test_seal_is_idempotent() {
    let mut ledger = ledger();
    ledger.append(draft(ActKind::Present, 0)).unwrap();
    ledger.seal(Some(json!({"witness": "auditor-1"}))).unwrap();
    let root = ledger.root().map(String::from);
    let context = ledger.context().clone();

    ledger.seal(Some(json!({"witness": "auditor-2"}))).unwrap();
    assert_eq!(ledger.root().map(String::from), root);
    assert_eq!(ledger.context(), &context);
}

#[test]
fn test_seal_records_attestation_in_context() {
    let mut ledger = ledger();
    ledger.seal(Some(json!({"witness": "auditor-1"}))).unwrap();
    assert_eq!(
        ledger.context()["attestations"],
        json!([{"witness": "auditor-1"}])
    );
}

#[test]
fn test_sealed_ledger_rejects_appends() {
    let mut ledger = ledger();
    ledger.seal(None).unwrap();

    assert!(matches!(
        ledger.append(draft(ActKind::Present, 0)),
        Err(LedgerError::Sealed { .. })
    ));

    let (registry, key) = registry_with_subject();
    let d = draft(ActKind::Agree, 1);
    let signature = sign_event(&d, &key).unwrap();
    assert!(matches!(
        ledger.append_attested(d, &signature, &registry, None),
        Err(LedgerError::Sealed { .. })
    ));
    assert!(ledger.is_empty().unwrap());
}

// =========================================================================
// Attestation
// =========================================================================

#[test]
fn test_policy_required_kind_rejected_on_plain_append() {
    let mut ledger = ledger();
    assert!(matches!(
        ledger.append(draft(ActKind::Agree, 0)),
        Err(LedgerError::AttestationRequired {
            kind: ActKind::Agree,
        })
    ));
    assert!(ledger.is_empty().unwrap());
}

#[test]
fn test_relaxed_policy_allows_plain_append() {
    let mut ledger = ledger().with_policy(AttestationPolicy::none());
    assert!(ledger.append(draft(ActKind::Agree, 0)).is_ok());
}

#[test]
fn test_attested_append_records_signature() {
    let (registry, key) = registry_with_subject();
    let mut ledger = ledger();
    ledger.append(draft(ActKind::Present, 0)).unwrap();

    let d = draft(ActKind::Agree, 1);
    let signature = sign_event(&d, &key).unwrap();
    let event = ledger
        .append_attested(d, &signature, &registry, None)
        .unwrap();

    assert_eq!(event.signature.as_deref(), Some(signature.as_str()));
    let records = ledger.signature_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_hash, event.curr_hash);
    assert_eq!(records[0].actor, "subject-1");
    assert_eq!(
        records[0].verifying_key,
        registry.lookup("subject-1").unwrap().public_key
    );

    assert!(ledger.verify_with_keys(&registry).unwrap().ok());
}

#[test]
fn test_failed_attestation_leaves_ledger_unmodified() {
    let (registry, key) = registry_with_subject();
    let mut ledger = ledger();
    let head = ledger.append(draft(ActKind::Present, 0)).unwrap();

    // Signature over different content than the submitted draft.
    let signature = sign_event(&draft(ActKind::Agree, 99), &key).unwrap();
    let err = ledger
        .append_attested(draft(ActKind::Agree, 1), &signature, &registry, None)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Bind(BindError::Signature)));

    assert_eq!(ledger.len().unwrap(), 1);
    assert_eq!(
        ledger.store_mut().latest_hash().unwrap().as_deref(),
        Some(head.curr_hash.as_str())
    );
    assert!(ledger.signature_records().is_empty());
}

#[test]
fn test_unknown_actor_rejected_before_mutation() {
    let mut ledger = ledger();
    let d = draft(ActKind::Agree, 0);
    let key = generate_signing_key();
    let signature = sign_event(&d, &key).unwrap();

    let err = ledger
        .append_attested(d, &signature, &MemoryKeyRegistry::new(), None)
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Bind(BindError::UnknownActor { .. })
    ));
    assert!(ledger.is_empty().unwrap());
}

#[test]
fn test_notarization_token_rides_event_and_record() {
    let (registry, key) = registry_with_subject();
    let mut ledger = ledger();

    let d = draft(ActKind::Agree, 0);
    let signature = sign_event(&d, &key).unwrap();
    let digest = hash::content_hash(signature.as_bytes());
    let token = SystemNotary::new().notarize(digest.as_bytes());

    let event = ledger
        .append_attested(d, &signature, &registry, Some(token.clone()))
        .unwrap();
    assert_eq!(event.notarization.as_ref(), Some(&token));
    assert_eq!(ledger.signature_records()[0].notarization.as_ref(), Some(&token));
}

#[test]
fn test_snapshot_key_survives_rotation() {
    let (mut registry, key) = registry_with_subject();
    let mut ledger = ledger();

    let d = draft(ActKind::Agree, 0);
    let signature = sign_event(&d, &key).unwrap();
    let event = ledger
        .append_attested(d, &signature, &registry, None)
        .unwrap();

    // Rotate: the registry forgets the old key.
    let new_key = generate_signing_key();
    registry
        .register("subject-1", new_key.verifying_key().as_bytes())
        .unwrap();

    // Audit against current keys now fails for the old signature...
    let report = ledger.verify_with_keys(&registry).unwrap();
    assert!(report
        .problems
        .iter()
        .any(|p| matches!(p, Problem::SignatureInvalid { index: 0 })));

    // ...but the record's snapshot still verifies it.
    let record = &ledger.signature_records()[0];
    let snapshot = crate::crypto::sign::parse_verifying_key(&record.verifying_key).unwrap();
    let sig = crate::crypto::sign::parse_signature(&record.signature).unwrap();
    let message = crate::binder::signing_message(&EventDraft {
        domain: event.domain.clone(),
        kind: event.kind,
        actor: event.actor.clone(),
        role: event.role,
        payload: event.payload.clone(),
        at: event.at.clone(),
    })
    .unwrap();
    assert!(crate::crypto::sign::verify_signature(&snapshot, &message, &sig));
}

// =========================================================================
// Export / import
// =========================================================================

#[test]
fn test_export_import_roundtrip() {
    let (registry, key) = registry_with_subject();
    let mut ledger = ledger();
    ledger.append(draft(ActKind::Present, 0)).unwrap();
    let d = draft(ActKind::Agree, 1);
    let signature = sign_event(&d, &key).unwrap();
    ledger
        .append_attested(d, &signature, &registry, None)
        .unwrap();
    ledger.seal(None).unwrap();

    let capsule = ledger.export().unwrap();
    let imported = Ledger::import(capsule.clone(), MemoryStore::new()).unwrap();

    assert_eq!(imported.id(), "session-1");
    assert_eq!(imported.subject_ref(), Some("subject-1"));
    assert!(imported.sealed());
    assert_eq!(imported.root(), ledger.root());
    assert!(imported.verify().unwrap().ok());
    assert!(imported.verify_with_keys(&registry).unwrap().ok());

    // Round-trip idempotence at the structural level.
    assert_eq!(imported.export().unwrap(), capsule);
}

#[test]
fn test_import_rejects_nonempty_store() {
    let mut seeded = MemoryStore::new();
    seeded
        .append(
            draft(ActKind::Present, 0)
                .at("2026-08-01T10:00:00.000000Z")
                .into_event(None, "hash-0".to_string()),
        )
        .unwrap();

    let capsule = ledger().export().unwrap();
    assert!(matches!(
        Ledger::import(capsule, seeded),
        Err(LedgerError::Malformed { .. })
    ));
}

#[test]
fn test_import_rejects_sealed_without_root() {
    let mut capsule = ledger().export().unwrap();
    capsule.sealed = true;
    capsule.root = None;
    assert!(matches!(
        Ledger::import(capsule, MemoryStore::new()),
        Err(LedgerError::Malformed { .. })
    ));
}

#[test]
fn test_import_does_not_verify_hashes() {
    let mut ledger = ledger();
    ledger.append(draft(ActKind::Present, 0)).unwrap();
    let mut capsule = ledger.export().unwrap();
    capsule.events[0].curr_hash = "0".repeat(64);

    // Structural import succeeds; only explicit verification objects.
    let imported = Ledger::import(capsule, MemoryStore::new()).unwrap();
    assert!(!imported.verify().unwrap().ok());
}

// =========================================================================
// SQLite-backed ledger
// =========================================================================

#[test]
fn test_sqlite_backed_ledger_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let (registry, key) = registry_with_subject();

    let root = {
        let mut ledger = Ledger::new("session-1", SqliteStore::open(&path).unwrap());
        ledger.append(draft(ActKind::Present, 0)).unwrap();
        let d = draft(ActKind::Agree, 1);
        let signature = sign_event(&d, &key).unwrap();
        ledger
            .append_attested(d, &signature, &registry, None)
            .unwrap();
        ledger.seal(None).unwrap();
        assert!(ledger.verify().unwrap().ok());
        ledger.root().map(String::from).unwrap()
    };

    // Events persist across reopen; the chain still verifies.
    let store = SqliteStore::open(&path).unwrap();
    let events = store.load().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].curr_hash, root);
    assert!(crate::verify::verify_events(&events).ok());
}
