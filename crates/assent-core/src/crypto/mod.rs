//! Cryptographic primitives: chain hashing, Ed25519 signing, key registry.
//!
//! Everything here is deterministic and synchronous. Digests and key
//! material use lowercase hex on the wire; hashing input is always the
//! canonical encoding from [`crate::canonical`].

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{EMPTY_ROOT, chain_hash, content_hash, digests_match};
pub use keys::{ActorKey, KeyRegistry, MemoryKeyRegistry};
pub use sign::{
    KeyMaterialError, PUBLIC_KEY_SIZE, SIGNATURE_SIZE, encode_signature, encode_verifying_key,
    generate_signing_key, parse_signature, parse_verifying_key, sign_message, validate_public_key,
    verify_signature,
};
