//! Canonical JSON encoding for hash-stable byte serialization.
//!
//! Every digest and signature in this crate is computed over the output of
//! this module, so the encoding must be byte-identical for semantically
//! equal values regardless of how they were constructed. The profile follows
//! RFC 8785 (JCS) with ledger-specific constraints:
//!
//! - **Sorted keys**: object keys are emitted in lexicographic (byte) order
//!   at every nesting level.
//! - **Fixed separators**: `,` between items, `:` between key and value, no
//!   insignificant whitespace.
//! - **Minimal escaping**: only `"`, `\`, and control characters U+0000
//!   through U+001F are escaped (short escapes where defined, `\uXXXX`
//!   otherwise). Everything else is emitted as raw UTF-8.
//! - **Integer-only numbers**: floats are rejected. Cross-platform float
//!   formatting is not deterministic enough to hash; callers encode
//!   non-integer quantities as strings, the same rule that already applies
//!   to raw binary (hex strings).
//! - **Bounded depth**: values nested deeper than [`MAX_DEPTH`] levels are
//!   rejected rather than risking stack exhaustion on adversarial input.
//!
//! # Example
//!
//! ```
//! use assent_core::canonical::to_canonical_string;
//! use serde_json::json;
//!
//! let value = json!({"z": 1, "a": {"nested": true}});
//! assert_eq!(
//!     to_canonical_string(&value).unwrap(),
//!     r#"{"a":{"nested":true},"z":1}"#
//! );
//! ```

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Maximum nesting depth accepted by the encoder.
pub const MAX_DEPTH: usize = 128;

/// Errors produced when a value cannot be canonically encoded.
///
/// These indicate unsupported value shapes, never transient conditions, so
/// retrying the same input is pointless.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodingError {
    /// A floating-point number was encountered.
    ///
    /// The canonical profile is integer-only; non-integer quantities must be
    /// pre-encoded as strings by the caller.
    #[error("float not allowed: canonical encoding is integer-only")]
    FloatNotAllowed,

    /// An integer is outside the signed 64-bit range.
    #[error("number out of range: {value} does not fit in a signed 64-bit integer")]
    NumberOutOfRange {
        /// Decimal representation of the offending number.
        value: String,
    },

    /// The value nests deeper than [`MAX_DEPTH`] levels.
    #[error("max depth exceeded: value nested deeper than {max_depth} levels")]
    MaxDepthExceeded {
        /// The depth limit that was exceeded.
        max_depth: usize,
    },

    /// The value could not be represented as JSON at all.
    ///
    /// Only reachable through [`encode`], when `serde_json` cannot convert
    /// the input (for example a map with non-string keys).
    #[error("unrepresentable value: {detail}")]
    Unrepresentable {
        /// Description from the underlying conversion.
        detail: String,
    },
}

/// Encodes a JSON value to canonical bytes.
///
/// This is the hashing input for the whole crate: chain hashes and signing
/// messages are computed over exactly these bytes.
///
/// # Errors
///
/// Returns [`EncodingError`] if the value contains floats, integers outside
/// i64 range, or nesting deeper than [`MAX_DEPTH`].
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, EncodingError> {
    Ok(to_canonical_string(value)?.into_bytes())
}

/// Encodes a JSON value to a canonical string.
///
/// Identical to [`canonical_bytes`] but returns the UTF-8 string form.
///
/// # Errors
///
/// Same conditions as [`canonical_bytes`].
pub fn to_canonical_string(value: &Value) -> Result<String, EncodingError> {
    validate_value(value, 0)?;
    let mut output = String::new();
    emit_value(value, &mut output);
    Ok(output)
}

/// Serializes any `Serialize` type and encodes it canonically.
///
/// # Errors
///
/// Returns [`EncodingError::Unrepresentable`] if the type cannot be
/// converted to JSON, plus the conditions of [`canonical_bytes`].
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodingError> {
    let json = serde_json::to_value(value).map_err(|e| EncodingError::Unrepresentable {
        detail: e.to_string(),
    })?;
    canonical_bytes(&json)
}

/// Recursively validates a value against the profile constraints.
fn validate_value(value: &Value, depth: usize) -> Result<(), EncodingError> {
    if depth > MAX_DEPTH {
        return Err(EncodingError::MaxDepthExceeded {
            max_depth: MAX_DEPTH,
        });
    }

    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => validate_number(n),
        Value::Array(items) => {
            for item in items {
                validate_value(item, depth + 1)?;
            }
            Ok(())
        },
        Value::Object(entries) => {
            for entry in entries.values() {
                validate_value(entry, depth + 1)?;
            }
            Ok(())
        },
    }
}

/// Validates that a number is an integer within i64 range.
fn validate_number(n: &Number) -> Result<(), EncodingError> {
    if n.as_i64().is_some() {
        return Ok(());
    }

    if let Some(u) = n.as_u64() {
        // Only reachable when u64 > i64::MAX; smaller values satisfy as_i64.
        return Err(EncodingError::NumberOutOfRange {
            value: u.to_string(),
        });
    }

    Err(EncodingError::FloatNotAllowed)
}

fn emit_value(value: &Value, output: &mut String) {
    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => emit_number(n, output),
        Value::String(s) => emit_string(s, output),
        Value::Array(items) => emit_array(items, output),
        Value::Object(entries) => emit_object(entries, output),
    }
}

/// Emits a validated number. Always an integer at this point.
fn emit_number(n: &Number, output: &mut String) {
    if let Some(i) = n.as_i64() {
        let _ = write!(output, "{i}");
    } else {
        // Unreachable after validation; emit serde's form rather than panic.
        output.push_str(&n.to_string());
    }
}

/// Emits a string with minimal escaping per RFC 8785 section 3.2.2.2.
///
/// Only `"`, `\`, and U+0000..=U+001F are escaped. Control characters with
/// short escapes use them; the rest use `\uXXXX`.
fn emit_string(s: &str, output: &mut String) {
    output.push('"');
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\u{0008}' => output.push_str("\\b"),
            '\u{000C}' => output.push_str("\\f"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if ('\u{0000}'..='\u{001F}').contains(&c) => {
                let _ = write!(output, "\\u{:04x}", c as u32);
            },
            c => output.push(c),
        }
    }
    output.push('"');
}

fn emit_array(items: &[Value], output: &mut String) {
    output.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_value(item, output);
    }
    output.push(']');
}

/// Emits an object with keys in lexicographic byte order.
fn emit_object(entries: &Map<String, Value>, output: &mut String) {
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();

    output.push('{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_string(key, output);
        output.push(':');
        emit_value(&entries[*key], output);
    }
    output.push('}');
}
