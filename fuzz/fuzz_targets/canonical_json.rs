//! Fuzz harness for the canonical JSON encoder.
//!
//! Feeds arbitrary bytes through `serde_json` parsing and then the
//! canonical encoder, checking that encoding never panics and that accepted
//! output is a fixed point: re-parsing canonical text and encoding again
//! must reproduce the same bytes.

#![no_main]

use assent_core::canonical::{canonical_bytes, to_canonical_string};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return;
    };

    // Must never panic; rejection (floats, depth, range) is fine.
    let Ok(canonical) = to_canonical_string(&value) else {
        return;
    };

    // Idempotence: canonical output re-encodes to itself.
    let reparsed: serde_json::Value =
        serde_json::from_str(&canonical).expect("canonical output must be valid JSON");
    assert_eq!(
        canonical_bytes(&reparsed).expect("canonical output must re-encode"),
        canonical.as_bytes()
    );
});
