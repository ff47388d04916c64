//! Chain hashing over canonical event content.
//!
//! Each event's digest commits to its content AND its predecessor: the
//! predecessor's digest is embedded into the content map under the reserved
//! `prev_hash` key before canonical encoding, so the chain strategy is part
//! of the hashed bytes themselves. A genesis event embeds JSON `null`, which
//! is type-distinct from every hex digest; there is deliberately no
//! zero-filled sentinel that a real digest could collide with.
//!
//! Digests are lowercase hex SHA-256, the form they take in stored events
//! and exported capsules.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::canonical::{self, EncodingError};

/// SHA-256 of the empty byte string, the root of a sealed empty ledger.
pub const EMPTY_ROOT: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Reserved key under which the predecessor digest is embedded.
const PREV_HASH_KEY: &str = "prev_hash";

/// Computes the SHA-256 digest of raw bytes as lowercase hex.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Computes an event's chain digest.
///
/// Embeds `prev_hash` (hex string, or JSON null when the event is first in
/// its ledger) into a copy of `content`, canonically encodes the result, and
/// hashes the bytes. The same content at a different chain position yields a
/// different digest.
///
/// # Errors
///
/// Returns [`EncodingError`] if the content cannot be canonically encoded,
/// for example a payload containing floats.
pub fn chain_hash(
    content: &Map<String, Value>,
    prev_hash: Option<&str>,
) -> Result<String, EncodingError> {
    let mut material = content.clone();
    material.insert(
        PREV_HASH_KEY.to_string(),
        match prev_hash {
            Some(digest) => Value::String(digest.to_string()),
            None => Value::Null,
        },
    );
    let bytes = canonical::canonical_bytes(&Value::Object(material))?;
    Ok(content_hash(&bytes))
}

/// Compares two hex digests in constant time.
///
/// Differing lengths compare unequal without early exit on content.
#[must_use]
pub fn digests_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_content() -> Map<String, Value> {
        let mut content = Map::new();
        content.insert("actor".to_string(), json!("subject-1"));
        content.insert("kind".to_string(), json!("agree"));
        content
    }

    #[test]
    fn test_content_hash_known_vector() {
        // FIPS 180-2 test vector for "abc".
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_empty_root_is_hash_of_nothing() {
        assert_eq!(content_hash(b""), EMPTY_ROOT);
    }

    #[test]
    fn test_genesis_embeds_null() {
        let digest = chain_hash(&sample_content(), None).unwrap();
        let expected = content_hash(br#"{"actor":"subject-1","kind":"agree","prev_hash":null}"#);
        assert_eq!(digest, expected);
    }

    #[test]
    fn test_link_embeds_prev_digest() {
        let prev = content_hash(b"anything");
        let digest = chain_hash(&sample_content(), Some(&prev)).unwrap();
        let expected = content_hash(
            format!(r#"{{"actor":"subject-1","kind":"agree","prev_hash":"{prev}"}}"#).as_bytes(),
        );
        assert_eq!(digest, expected);
    }

    #[test]
    fn test_same_content_different_position_differs() {
        let content = sample_content();
        let genesis = chain_hash(&content, None).unwrap();
        let linked = chain_hash(&content, Some(&genesis)).unwrap();
        assert_ne!(genesis, linked);
    }

    #[test]
    fn test_content_change_changes_digest() {
        let mut content = sample_content();
        let original = chain_hash(&content, None).unwrap();
        content.insert("actor".to_string(), json!("subject-2"));
        assert_ne!(chain_hash(&content, None).unwrap(), original);
    }

    #[test]
    fn test_chain_hash_rejects_floats() {
        let mut content = sample_content();
        content.insert("score".to_string(), json!(0.5));
        assert!(chain_hash(&content, None).is_err());
    }

    #[test]
    fn test_digests_match() {
        let a = content_hash(b"x");
        assert!(digests_match(&a, &a.clone()));
        assert!(!digests_match(&a, &content_hash(b"y")));
        assert!(!digests_match(&a, &a[..32]));
    }
}
