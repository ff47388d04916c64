//! Ed25519 signing primitives.
//!
//! Thin wrappers over `ed25519-dalek` that fix the wire forms used by the
//! ledger: keys and signatures travel as lowercase hex, and all parsing is
//! fail-closed (wrong length, undecodable points, and known weak keys are
//! rejected before any verification is attempted).

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Errors raised while parsing or validating key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyMaterialError {
    /// The hex encoding could not be decoded.
    #[error("invalid hex encoding")]
    InvalidHex,

    /// The decoded material has the wrong byte length.
    #[error("wrong length: expected {expected} bytes, got {actual}")]
    WrongLength {
        /// Required length for this material.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// The bytes do not decode to a valid Ed25519 point.
    #[error("not a valid Ed25519 public key")]
    InvalidPoint,

    /// The key is a known small-order point.
    #[error("weak Ed25519 public key rejected")]
    WeakKey,
}

/// Generates a fresh signing key from the operating system RNG.
#[must_use]
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Validates raw public key bytes and returns the verifying key.
///
/// # Errors
///
/// Returns [`KeyMaterialError`] on wrong length, undecodable point, or a
/// known weak key.
pub fn validate_public_key(bytes: &[u8]) -> Result<VerifyingKey, KeyMaterialError> {
    let arr: [u8; PUBLIC_KEY_SIZE] =
        bytes
            .try_into()
            .map_err(|_| KeyMaterialError::WrongLength {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            })?;
    let key = VerifyingKey::from_bytes(&arr).map_err(|_| KeyMaterialError::InvalidPoint)?;
    if key.is_weak() {
        return Err(KeyMaterialError::WeakKey);
    }
    Ok(key)
}

/// Parses a hex-encoded verifying key, applying [`validate_public_key`].
///
/// # Errors
///
/// Returns [`KeyMaterialError`] for bad hex or invalid key material.
pub fn parse_verifying_key(hex_key: &str) -> Result<VerifyingKey, KeyMaterialError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyMaterialError::InvalidHex)?;
    validate_public_key(&bytes)
}

/// Parses a hex-encoded signature.
///
/// # Errors
///
/// Returns [`KeyMaterialError`] for bad hex or wrong length.
pub fn parse_signature(hex_sig: &str) -> Result<Signature, KeyMaterialError> {
    let bytes = hex::decode(hex_sig).map_err(|_| KeyMaterialError::InvalidHex)?;
    Signature::from_slice(&bytes).map_err(|_| KeyMaterialError::WrongLength {
        expected: SIGNATURE_SIZE,
        actual: bytes.len(),
    })
}

/// Signs a message and returns the detached signature.
#[must_use]
pub fn sign_message(key: &SigningKey, message: &[u8]) -> Signature {
    key.sign(message)
}

/// Verifies a detached signature over a message.
///
/// Returns a bare boolean so callers cannot distinguish failure causes.
#[must_use]
pub fn verify_signature(key: &VerifyingKey, message: &[u8], signature: &Signature) -> bool {
    key.verify(message, signature).is_ok()
}

/// Hex form of a verifying key, as stored in registry entries and records.
#[must_use]
pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    hex::encode(key.to_bytes())
}

/// Hex form of a signature, as carried on events.
#[must_use]
pub fn encode_signature(signature: &Signature) -> String {
    hex::encode(signature.to_bytes())
}
