//! Verdict computation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use ptr_model::{
    ClassificationBatch, ClassificationResult, Finding, FindingCode, GateStatus, Outcome,
    Severity, StagedRow, ValidationVerdict, VerdictCounts, is_well_formed_abn,
};

/// Itemized findings are capped per severity; `counts.by_code` always
/// carries the true totals.
pub const MAX_ITEMIZED_FINDINGS: usize = 100;

struct FindingSink {
    blockers: Vec<Finding>,
    warnings: Vec<Finding>,
    counts: VerdictCounts,
}

impl FindingSink {
    fn new() -> Self {
        Self {
            blockers: Vec::new(),
            warnings: Vec::new(),
            counts: VerdictCounts::default(),
        }
    }

    fn record(&mut self, finding: Finding) {
        *self.counts.by_code.entry(finding.code).or_insert(0) += 1;
        let list = match finding.code.severity() {
            Severity::Blocker => &mut self.blockers,
            Severity::Warning => &mut self.warnings,
        };
        if list.len() < MAX_ITEMIZED_FINDINGS {
            list.push(finding);
        }
    }

    fn into_verdict(self) -> ValidationVerdict {
        let has_blockers = self
            .counts
            .by_code
            .keys()
            .any(|code| code.severity() == Severity::Blocker);
        let has_warnings = self
            .counts
            .by_code
            .keys()
            .any(|code| code.severity() == Severity::Warning);
        let status = if has_blockers {
            GateStatus::Blocked
        } else if has_warnings {
            GateStatus::PassedWithWarnings
        } else {
            GateStatus::Passed
        };
        ValidationVerdict {
            status,
            blockers: self.blockers,
            warnings: self.warnings,
            counts: self.counts,
        }
    }
}

/// Compute the gate verdict for a run's current state.
///
/// `latest_batch` and `results` are the run's active classification batch
/// and its parsed results; `rows` is the full staged row set, annotations
/// included. Excluded rows are skipped entirely and only counted.
///
/// Without an acceptable batch the verdict is a single structural
/// `CLASSIFICATION_MISSING` blocker and no rows are scanned, however many
/// exist.
pub fn compute_verdict(
    rows: &[StagedRow],
    latest_batch: Option<&ClassificationBatch>,
    results: &[ClassificationResult],
) -> ValidationVerdict {
    let mut sink = FindingSink::new();

    let batch = match latest_batch {
        Some(batch) if batch.status.is_acceptable() => batch,
        _ => {
            sink.record(Finding {
                code: FindingCode::ClassificationMissing,
                row: None,
                message: "no acceptable classification batch has been imported".to_string(),
            });
            let verdict = sink.into_verdict();
            info!(status = ?verdict.status, "validation verdict (structural)");
            return verdict;
        }
    };

    let by_identifier: BTreeMap<&str, &ClassificationResult> = results
        .iter()
        .map(|result| (result.identifier.as_str(), result))
        .collect();
    let invalid_identifiers: BTreeSet<&str> = results
        .iter()
        .filter(|result| !result.is_valid_abn)
        .map(|result| result.identifier.as_str())
        .collect();

    for row in rows {
        if row.is_excluded() {
            sink.counts.excluded_rows += 1;
            continue;
        }
        sink.counts.scanned_rows += 1;
        let number = row.row_number;

        let Some(abn) = row.payee_abn() else {
            sink.record(Finding {
                code: FindingCode::PayeeIdMissing,
                row: Some(number),
                message: format!("row {number} has no payee identifier"),
            });
            continue;
        };
        if !is_well_formed_abn(&abn) {
            sink.record(Finding {
                code: FindingCode::PayeeIdInvalid,
                row: Some(number),
                message: format!("row {number} payee identifier {abn} is not eleven digits"),
            });
            continue;
        }
        if invalid_identifiers.contains(abn.as_str()) {
            sink.record(Finding {
                code: FindingCode::ClassificationInvalidId,
                row: Some(number),
                message: format!(
                    "row {number} identifier {abn} was flagged invalid during import"
                ),
            });
            continue;
        }
        let Some(result) = by_identifier.get(abn.as_str()) else {
            sink.record(Finding {
                code: FindingCode::ClassificationNoMatch,
                row: Some(number),
                message: format!("row {number} identifier {abn} has no classification result"),
            });
            continue;
        };
        if result.outcome == Outcome::Unrecognized {
            sink.record(Finding {
                code: FindingCode::ClassificationUnknownOutcome,
                row: Some(number),
                message: format!(
                    "row {number} outcome {:?} is not interpretable",
                    result.outcome_text
                ),
            });
            continue;
        }
        let Some(mark) = row.annotations.classification.filter(|m| m.batch == batch.id) else {
            sink.record(Finding {
                code: FindingCode::ClassificationEvidenceStale,
                row: Some(number),
                message: format!("row {number} was not classified by the active batch"),
            });
            continue;
        };
        if result.outcome.expected_flag() != Some(mark.is_small_business) {
            sink.record(Finding {
                code: FindingCode::ClassificationFlagMismatch,
                row: Some(number),
                message: format!(
                    "row {number} stored flag {} disagrees with outcome {:?}",
                    mark.is_small_business, result.outcome_text
                ),
            });
        }
    }

    let verdict = sink.into_verdict();
    info!(
        status = ?verdict.status,
        scanned = verdict.counts.scanned_rows,
        excluded = verdict.counts.excluded_rows,
        "validation verdict"
    );
    verdict
}
