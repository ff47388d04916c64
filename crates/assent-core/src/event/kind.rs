//! Act kinds and their per-kind policy attributes.
//!
//! The kind vocabulary is a closed enumeration. Downstream policy — whether
//! a kind needs a signature, how telemetry classifies it, what label it
//! displays under — lives in one static attribute table instead of
//! conditionals scattered across call sites.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of an understanding/consent act.
///
/// Wire names are stable snake_case strings; adding a kind is a schema
/// change, not a free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActKind {
    /// Material was presented to the subject.
    Present,
    /// The subject asked for clarification.
    ClarifyRequest,
    /// The subject deferred the decision.
    AskLater,
    /// The subject acknowledged a summary of the material.
    AckSummary,
    /// The subject agreed. Irreversible; requires attestation.
    Agree,
    /// The decision was parked pending further input.
    Pending,
    /// The material was re-explained after a clarification.
    ReExplain,
    /// The subject re-viewed material after the session.
    ReView,
    /// A prior agreement was revoked. Requires attestation.
    Revoke,
    /// A mitigation was applied to the subject's record.
    Mitigate,
    /// A previously applied mitigation was removed.
    MitigateRemove,
}

/// Telemetry classification of an act kind.
///
/// The table only classifies; telemetry arithmetic happens outside this
/// crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryClass {
    /// Clarification was requested or the decision deferred.
    Clarification,
    /// Material had to be explained again.
    ReExplanation,
    /// Material was viewed again after the session.
    PostView,
    /// Decision parked.
    Pending,
    /// Agreement withdrawn.
    Revocation,
}

/// Static policy attributes of one act kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindAttributes {
    /// Human-readable display label.
    pub label: &'static str,
    /// Whether events of this kind must carry a verified signature.
    pub signature_required: bool,
    /// Telemetry classification, if the kind feeds telemetry at all.
    pub telemetry: Option<TelemetryClass>,
}

/// Parse error for an unrecognized wire name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown act kind: {0:?}")]
pub struct UnknownActKind(pub String);

impl ActKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Present,
        Self::ClarifyRequest,
        Self::AskLater,
        Self::AckSummary,
        Self::Agree,
        Self::Pending,
        Self::ReExplain,
        Self::ReView,
        Self::Revoke,
        Self::Mitigate,
        Self::MitigateRemove,
    ];

    /// Stable snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::ClarifyRequest => "clarify_request",
            Self::AskLater => "ask_later",
            Self::AckSummary => "ack_summary",
            Self::Agree => "agree",
            Self::Pending => "pending",
            Self::ReExplain => "re_explain",
            Self::ReView => "re_view",
            Self::Revoke => "revoke",
            Self::Mitigate => "mitigate",
            Self::MitigateRemove => "mitigate_remove",
        }
    }

    /// The static attribute table entry for this kind.
    #[must_use]
    pub const fn attributes(self) -> KindAttributes {
        match self {
            Self::Present => KindAttributes {
                label: "Presented",
                signature_required: false,
                telemetry: None,
            },
            Self::ClarifyRequest => KindAttributes {
                label: "Clarification requested",
                signature_required: false,
                telemetry: Some(TelemetryClass::Clarification),
            },
            Self::AskLater => KindAttributes {
                label: "Deferred",
                signature_required: false,
                telemetry: Some(TelemetryClass::Clarification),
            },
            Self::AckSummary => KindAttributes {
                label: "Summary acknowledged",
                signature_required: false,
                telemetry: None,
            },
            Self::Agree => KindAttributes {
                label: "Agreed",
                signature_required: true,
                telemetry: None,
            },
            Self::Pending => KindAttributes {
                label: "Pending",
                signature_required: false,
                telemetry: Some(TelemetryClass::Pending),
            },
            Self::ReExplain => KindAttributes {
                label: "Re-explained",
                signature_required: false,
                telemetry: Some(TelemetryClass::ReExplanation),
            },
            Self::ReView => KindAttributes {
                label: "Re-viewed",
                signature_required: false,
                telemetry: Some(TelemetryClass::PostView),
            },
            Self::Revoke => KindAttributes {
                label: "Revoked",
                signature_required: true,
                telemetry: Some(TelemetryClass::Revocation),
            },
            Self::Mitigate => KindAttributes {
                label: "Mitigation applied",
                signature_required: false,
                telemetry: None,
            },
            Self::MitigateRemove => KindAttributes {
                label: "Mitigation removed",
                signature_required: false,
                telemetry: None,
            },
        }
    }

    /// Shorthand for `attributes().signature_required`.
    #[must_use]
    pub const fn signature_required(self) -> bool {
        self.attributes().signature_required
    }
}

impl fmt::Display for ActKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActKind {
    type Err = UnknownActKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownActKind(s.to_string()))
    }
}
