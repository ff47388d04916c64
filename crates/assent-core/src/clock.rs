//! Timestamp formatting shared across the crate.
//!
//! Events hash the exact timestamp string they carry, so every producer of
//! an `at` field must format identically. One formatter, used everywhere.

use chrono::{SecondsFormat, Utc};

/// Current UTC time as RFC 3339 with microsecond precision and `Z` suffix.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
