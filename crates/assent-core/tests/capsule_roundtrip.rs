//! Capsule export/import round-trips and structural-vs-cryptographic
//! separation.

use assent_core::binder::sign_event;
use assent_core::crypto::sign::generate_signing_key;
use assent_core::{
    ActKind, ActorRole, Capsule, EventDraft, KeyRegistry, Ledger, MemoryKeyRegistry, MemoryStore,
};
use serde_json::json;

fn populated_ledger() -> (Ledger<MemoryStore>, MemoryKeyRegistry) {
    let mut registry = MemoryKeyRegistry::new();
    let key = generate_signing_key();
    registry
        .register("subject-1", key.verifying_key().as_bytes())
        .unwrap();

    let mut context = serde_json::Map::new();
    context.insert("locale".to_string(), json!("en"));

    let mut ledger = Ledger::new("session-1", MemoryStore::new())
        .with_subject("subject-1")
        .with_context(context);

    ledger
        .append(
            EventDraft::new("consent", ActKind::Present, "presenter-1", ActorRole::Presenter)
                .with_field("document", json!("procedure-brief-v2")),
        )
        .unwrap();
    ledger
        .append(EventDraft::new(
            "consent",
            ActKind::AckSummary,
            "subject-1",
            ActorRole::Subject,
        ))
        .unwrap();

    let agree = EventDraft::new("consent", ActKind::Agree, "subject-1", ActorRole::Subject);
    let signature = sign_event(&agree, &key).unwrap();
    ledger
        .append_attested(agree, &signature, &registry, None)
        .unwrap();

    (ledger, registry)
}

#[test]
fn export_import_export_is_idempotent() {
    let (mut ledger, _) = populated_ledger();
    ledger.seal(Some(json!({"witness": "auditor-1"}))).unwrap();

    let first = ledger.export().unwrap();
    let json = first.to_json().unwrap();

    let imported = Capsule::from_json(&json).unwrap();
    let second = imported.to_json().unwrap();
    assert_eq!(json, second);

    // And through a full ledger rebuild.
    let rebuilt = Ledger::import(imported, MemoryStore::new()).unwrap();
    assert_eq!(rebuilt.export().unwrap(), first);
}

#[test]
fn imported_capsule_verifies_like_the_original() {
    let (mut ledger, registry) = populated_ledger();
    ledger.seal(None).unwrap();

    let capsule = Capsule::from_json(&ledger.export().unwrap().to_json().unwrap()).unwrap();
    assert!(capsule.verify().ok());

    let rebuilt = Ledger::import(capsule, MemoryStore::new()).unwrap();
    assert!(rebuilt.verify().unwrap().ok());
    assert!(rebuilt.verify_with_keys(&registry).unwrap().ok());
}

#[test]
fn metadata_travels_losslessly() {
    let (mut ledger, _) = populated_ledger();
    ledger.seal(None).unwrap();

    let capsule = ledger.export().unwrap();
    assert_eq!(capsule.ledger_id, "session-1");
    assert_eq!(capsule.subject_ref.as_deref(), Some("subject-1"));
    assert_eq!(capsule.context["locale"], json!("en"));
    assert!(capsule.sealed);
    assert_eq!(
        capsule.root.as_deref(),
        Some(capsule.events.last().unwrap().curr_hash.as_str())
    );

    let back = Capsule::from_json(&capsule.to_json_pretty().unwrap()).unwrap();
    assert_eq!(back, capsule);
}

#[test]
fn structural_and_cryptographic_checks_are_independent() {
    let (ledger, _) = populated_ledger();
    let mut capsule = ledger.export().unwrap();

    // Forge the payload of the signed agreement.
    let last = capsule.events.len() - 1;
    capsule.events[last]
        .payload
        .insert("form".to_string(), json!("forged"));

    // Import accepts the structure unchanged...
    let json = capsule.to_json().unwrap();
    let reimported = Capsule::from_json(&json).unwrap();
    assert_eq!(reimported, capsule);

    // ...and only verification reports the forgery.
    assert!(!reimported.verify().ok());
}

#[test]
fn truncated_json_is_rejected() {
    let (ledger, _) = populated_ledger();
    let json = ledger.export().unwrap().to_json().unwrap();
    let truncated = &json[..json.len() / 2];
    assert!(Capsule::from_json(truncated).is_err());
}
