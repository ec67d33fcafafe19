//! Classification batches and results.
//!
//! Classification itself happens in an external tool; this core only
//! imports its export and applies the verdicts. Outcome text is matched
//! against the two canonical phrases the tool emits; anything else is kept
//! verbatim but flagged unrecognized so the gate can refuse to interpret it.

use serde::{Deserialize, Serialize};

use crate::ids::{BatchId, RunId, TenantId};

/// Canonical outcome phrase for a small business.
pub const OUTCOME_SMALL_BUSINESS: &str = "Small business for payment times reporting";
/// Canonical outcome phrase for a non-small business.
pub const OUTCOME_NOT_SMALL_BUSINESS: &str = "Not a small business for payment times reporting";

/// Parsed classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    SmallBusiness,
    NotSmallBusiness,
    /// Outcome text matched neither canonical phrase.
    Unrecognized,
}

impl Outcome {
    /// Match outcome text case-insensitively against the canonical phrases.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case(OUTCOME_SMALL_BUSINESS) {
            Self::SmallBusiness
        } else if trimmed.eq_ignore_ascii_case(OUTCOME_NOT_SMALL_BUSINESS) {
            Self::NotSmallBusiness
        } else {
            Self::Unrecognized
        }
    }

    /// The small-business flag this outcome implies, when interpretable.
    pub fn expected_flag(&self) -> Option<bool> {
        match self {
            Self::SmallBusiness => Some(true),
            Self::NotSmallBusiness => Some(false),
            Self::Unrecognized => None,
        }
    }
}

/// One (identifier -> verdict) pair within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Normalized (digits-only) identifier.
    pub identifier: String,
    /// Outcome text exactly as imported.
    pub outcome_text: String,
    pub outcome: Outcome,
    /// False when the identifier fails the eleven-digit shape check.
    pub is_valid_abn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// Overall status of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Applied,
    AppliedWithWarnings,
    Blocked,
}

impl BatchStatus {
    /// Whether the validation gate may rely on this batch.
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Self::Applied | Self::AppliedWithWarnings)
    }
}

/// Supersession is a distinct state from deletion: a superseded batch stays
/// queryable as evidence, it just no longer drives matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchLifecycle {
    Active,
    Superseded,
}

/// A parse/validation issue noted during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    /// 1-based line in the import file.
    pub line: u64,
    pub message: String,
}

/// One import of externally produced classification results for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationBatch {
    pub id: BatchId,
    pub tenant: TenantId,
    pub run: RunId,
    /// Hex sha256 of the import file, for exact re-import detection.
    pub file_hash: String,
    pub total_rows: u64,
    pub valid_rows: u64,
    pub invalid_identifier_rows: u64,
    pub unrecognized_outcome_rows: u64,
    pub status: BatchStatus,
    pub lifecycle: BatchLifecycle,
    #[serde(default)]
    pub issues: Vec<ImportIssue>,
}
