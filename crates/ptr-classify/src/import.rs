//! Parsing of externally produced classification exports.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use tracing::info;

use ptr_model::{
    BatchStatus, CancelToken, ClassificationResult, ImportIssue, Outcome, is_well_formed_abn,
    normalize_abn,
};

use crate::error::ClassifyError;

/// Records between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 256;

/// Everything parsed out of one classification file, before a batch id is
/// assigned.
#[derive(Debug)]
pub struct ImportOutcome {
    /// Hex sha256 of the raw bytes, for exact re-import detection.
    pub file_hash: String,
    pub results: Vec<ClassificationResult>,
    pub issues: Vec<ImportIssue>,
    pub total_rows: u64,
    pub valid_rows: u64,
    pub invalid_identifier_rows: u64,
    pub unrecognized_outcome_rows: u64,
    pub status: BatchStatus,
}

/// Parse `(identifier, outcome[, year])` tuples from delimited text.
///
/// Identifiers are normalized to digits; a wrong digit count is recorded
/// on the result (`is_valid_abn = false`), not dropped — an unverifiable
/// identifier must still match rows so the gate can raise a blocker.
/// Outcome text outside the two canonical phrases is stored verbatim and
/// flagged unrecognized. At most one result per identifier; duplicates are
/// an issue and the first occurrence wins. A file yielding no usable rows
/// produces a `Blocked` outcome rather than an error, so the rejection and
/// its parse-issue summary are recorded the same way as any import.
pub fn parse_results(bytes: &[u8], cancel: &CancelToken) -> Result<ImportOutcome, ClassifyError> {
    let file_hash = hex::encode(Sha256::digest(bytes));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut results: Vec<ClassificationResult> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut issues: Vec<ImportIssue> = Vec::new();
    let mut total_rows = 0u64;
    let mut invalid_identifier_rows = 0u64;
    let mut unrecognized_outcome_rows = 0u64;

    for (index, record) in reader.records().enumerate() {
        if index % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return Err(ClassifyError::Cancelled);
        }
        let line = index as u64 + 1;
        let record = record?;

        let raw_identifier = record.get(0).unwrap_or("");
        let identifier = normalize_abn(raw_identifier);
        // A header line carries no digits in its identifier column.
        if index == 0 && identifier.is_empty() && !raw_identifier.trim().is_empty() {
            continue;
        }
        total_rows += 1;

        if record.len() < 2 {
            issues.push(ImportIssue {
                line,
                message: "expected identifier and outcome columns".to_string(),
            });
            continue;
        }
        if identifier.is_empty() {
            issues.push(ImportIssue {
                line,
                message: "identifier column contains no digits".to_string(),
            });
            continue;
        }
        if !seen.insert(identifier.clone()) {
            issues.push(ImportIssue {
                line,
                message: format!("duplicate identifier {identifier}; first occurrence kept"),
            });
            continue;
        }

        let is_valid_abn = is_well_formed_abn(&identifier);
        if !is_valid_abn {
            invalid_identifier_rows += 1;
            issues.push(ImportIssue {
                line,
                message: format!("identifier {identifier} is not eleven digits"),
            });
        }

        let outcome_text = record.get(1).unwrap_or("").trim().to_string();
        let outcome = Outcome::parse(&outcome_text);
        if outcome == Outcome::Unrecognized {
            unrecognized_outcome_rows += 1;
            issues.push(ImportIssue {
                line,
                message: format!("unrecognized outcome {outcome_text:?}"),
            });
        }

        let year = match record.get(2).map(str::trim) {
            Some(text) if !text.is_empty() => match text.parse::<i32>() {
                Ok(year) => Some(year),
                Err(_) => {
                    issues.push(ImportIssue {
                        line,
                        message: format!("year column {text:?} is not a number"),
                    });
                    None
                }
            },
            _ => None,
        };

        results.push(ClassificationResult {
            identifier,
            outcome_text,
            outcome,
            is_valid_abn,
            year,
        });
    }

    let valid_rows = results
        .iter()
        .filter(|r| r.is_valid_abn && r.outcome != Outcome::Unrecognized)
        .count() as u64;
    let status = if results.is_empty() {
        BatchStatus::Blocked
    } else if !issues.is_empty() {
        BatchStatus::AppliedWithWarnings
    } else {
        BatchStatus::Applied
    };

    info!(
        total_rows,
        valid_rows,
        invalid_identifier_rows,
        unrecognized_outcome_rows,
        issues = issues.len(),
        ?status,
        "parsed classification file"
    );
    Ok(ImportOutcome {
        file_hash,
        results,
        issues,
        total_rows,
        valid_rows,
        invalid_identifier_rows,
        unrecognized_outcome_rows,
        status,
    })
}
