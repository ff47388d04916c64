//! Fuzz harness for capsule import.
//!
//! Arbitrary bytes must never panic the structural parser, and anything it
//! accepts must survive a lossless serialize/parse round-trip and a full
//! verification pass (which may, of course, report problems).

#![no_main]

use assent_core::Capsule;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(capsule) = Capsule::from_json(text) else {
        return;
    };

    // Verification is total over accepted structures.
    let _ = capsule.verify();

    // Round-trip stability.
    if let Ok(json) = capsule.to_json() {
        let back = Capsule::from_json(&json).expect("re-import of exported capsule");
        assert_eq!(back, capsule);
    }
});
