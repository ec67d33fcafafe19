//! Attaching classification verdicts to staged rows.

use std::collections::BTreeMap;

use tracing::info;

use ptr_model::{
    Annotations, ClassificationBatch, ClassificationMark, ClassificationResult, RowNumber,
    StagedRow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSummary {
    pub matched_rows: u64,
    pub unmatched_rows: u64,
}

/// Match staged rows against a batch's results by normalized identifier.
///
/// Every staged row whose payee identifier equals a result identifier gets
/// the result's verdict plus the batch id as its evidence reference —
/// including results with invalid identifiers, which must match so the
/// gate can block them. Rows without a match keep whatever mark they
/// already carry; a stale mark from a superseded batch is the gate's
/// business to flag, not the matcher's to erase.
pub fn match_rows(
    batch: &ClassificationBatch,
    results: &[ClassificationResult],
    rows: &[StagedRow],
) -> (Vec<(RowNumber, Annotations)>, MatchSummary) {
    let by_identifier: BTreeMap<&str, &ClassificationResult> = results
        .iter()
        .map(|result| (result.identifier.as_str(), result))
        .collect();

    let mut annotations = Vec::new();
    let mut summary = MatchSummary {
        matched_rows: 0,
        unmatched_rows: 0,
    };
    for row in rows {
        let matched = row
            .payee_abn()
            .and_then(|abn| by_identifier.get(abn.as_str()).copied());
        match matched {
            Some(result) => {
                summary.matched_rows += 1;
                let mut bag = row.annotations.clone();
                bag.classification = Some(ClassificationMark {
                    is_small_business: result.outcome.expected_flag().unwrap_or(false),
                    batch: batch.id,
                });
                annotations.push((row.row_number, bag));
            }
            None => summary.unmatched_rows += 1,
        }
    }

    info!(
        batch = %batch.id,
        matched = summary.matched_rows,
        unmatched = summary.unmatched_rows,
        "matched classification results"
    );
    (annotations, summary)
}
