//! Validation verdicts: the gate's output.
//!
//! Verdicts are computed on demand from the current staged row set and the
//! latest classification batch; they are never persisted as rows. The UI
//! and retry automation key off `FindingCode`, so codes are stable wire
//! strings, not message text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ModelError;
use crate::ids::RowNumber;

/// Finding severity. Blockers stop report generation; warnings do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocker,
    Warning,
}

/// Machine-readable finding codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCode {
    /// Structural: no acceptable classification batch exists for the run.
    ClassificationMissing,
    PayeeIdMissing,
    PayeeIdInvalid,
    /// Identifier appears in the batch's invalid-identifier set.
    ClassificationInvalidId,
    /// Identifier has no classification result at all.
    ClassificationNoMatch,
    /// Matched result's outcome text is not interpretable.
    ClassificationUnknownOutcome,
    /// Row was classified by a superseded batch.
    ClassificationEvidenceStale,
    /// Row's stored flag disagrees with the matched outcome.
    ClassificationFlagMismatch,
}

impl FindingCode {
    pub const ALL: [FindingCode; 8] = [
        FindingCode::ClassificationMissing,
        FindingCode::PayeeIdMissing,
        FindingCode::PayeeIdInvalid,
        FindingCode::ClassificationInvalidId,
        FindingCode::ClassificationNoMatch,
        FindingCode::ClassificationUnknownOutcome,
        FindingCode::ClassificationEvidenceStale,
        FindingCode::ClassificationFlagMismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassificationMissing => "CLASSIFICATION_MISSING",
            Self::PayeeIdMissing => "PAYEE_ID_MISSING",
            Self::PayeeIdInvalid => "PAYEE_ID_INVALID",
            Self::ClassificationInvalidId => "CLASSIFICATION_INVALID_ID",
            Self::ClassificationNoMatch => "CLASSIFICATION_NO_MATCH",
            Self::ClassificationUnknownOutcome => "CLASSIFICATION_UNKNOWN_OUTCOME",
            Self::ClassificationEvidenceStale => "CLASSIFICATION_EVIDENCE_STALE",
            Self::ClassificationFlagMismatch => "CLASSIFICATION_FLAG_MISMATCH",
        }
    }

    /// Only `CLASSIFICATION_NO_MATCH` is a warning: a structurally valid
    /// dataset may legitimately contain payees outside the export.
    pub fn severity(&self) -> Severity {
        match self {
            Self::ClassificationNoMatch => Severity::Warning,
            _ => Severity::Blocker,
        }
    }
}

impl std::fmt::Display for FindingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FindingCode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|code| code.as_str() == s)
            .copied()
            .ok_or_else(|| ModelError::UnknownFindingCode(s.to_string()))
    }
}

/// One itemized blocker or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: FindingCode,
    /// Absent for structural findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<RowNumber>,
    pub message: String,
}

/// True totals, unaffected by itemized-list truncation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCounts {
    /// Non-excluded rows the scan visited.
    pub scanned_rows: u64,
    /// Rows skipped because a rule excluded them.
    pub excluded_rows: u64,
    /// Per-code totals across the whole row set.
    pub by_code: BTreeMap<FindingCode, u64>,
}

/// Overall gate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Blocked,
    PassedWithWarnings,
    Passed,
}

impl GateStatus {
    /// Report generation is a hard no-op unless this returns true.
    pub fn allows_report(&self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// The gate's verdict for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub status: GateStatus,
    /// Itemized blockers, capped; see `counts` for true totals.
    pub blockers: Vec<Finding>,
    /// Itemized warnings, capped; see `counts` for true totals.
    pub warnings: Vec<Finding>,
    pub counts: VerdictCounts,
}
