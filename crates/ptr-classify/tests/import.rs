use std::collections::BTreeMap;

use ptr_model::{
    Annotations, BatchLifecycle, BatchStatus, CancelToken, CanonicalField, ClassificationBatch,
    FieldValue, Outcome, RowNumber, RunId, StagedRow, TenantId,
};

use ptr_classify::{ClassifyError, match_rows, parse_results};

const SMALL: &str = "Small business for payment times reporting";
const NOT_SMALL: &str = "Not a small business for payment times reporting";

fn parse(text: &str) -> ptr_classify::ImportOutcome {
    parse_results(text.as_bytes(), &CancelToken::new()).expect("parse")
}

#[test]
fn parses_identifier_outcome_year_tuples() {
    let outcome = parse(&format!(
        "ABN,Outcome,Year\n51 824 753 556,{SMALL},2024\n44000000000,{NOT_SMALL},\n"
    ));
    assert_eq!(outcome.total_rows, 2);
    assert_eq!(outcome.valid_rows, 2);
    assert_eq!(outcome.status, BatchStatus::Applied);

    let first = &outcome.results[0];
    assert_eq!(first.identifier, "51824753556");
    assert_eq!(first.outcome, Outcome::SmallBusiness);
    assert!(first.is_valid_abn);
    assert_eq!(first.year, Some(2024));
    assert_eq!(outcome.results[1].year, None);
}

#[test]
fn wrong_digit_count_is_recorded_not_dropped() {
    let outcome = parse(&format!("518247,{SMALL}\n"));
    assert_eq!(outcome.invalid_identifier_rows, 1);
    assert_eq!(outcome.status, BatchStatus::AppliedWithWarnings);
    let result = &outcome.results[0];
    assert!(!result.is_valid_abn);
    assert_eq!(result.identifier, "518247");
}

#[test]
fn unrecognized_outcome_is_kept_verbatim_and_flagged() {
    let outcome = parse("51824753556,Probably fine\n");
    assert_eq!(outcome.unrecognized_outcome_rows, 1);
    let result = &outcome.results[0];
    assert_eq!(result.outcome, Outcome::Unrecognized);
    assert_eq!(result.outcome_text, "Probably fine");
    assert_eq!(outcome.status, BatchStatus::AppliedWithWarnings);
}

#[test]
fn duplicate_identifier_first_occurrence_wins() {
    let outcome = parse(&format!(
        "51824753556,{SMALL}\n51 824 753 556,{NOT_SMALL}\n"
    ));
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].outcome, Outcome::SmallBusiness);
    assert!(outcome.issues.iter().any(|i| i.message.contains("duplicate")));
}

#[test]
fn unusable_file_yields_blocked_outcome() {
    let outcome = parse("no identifiers here\n,also nothing\n");
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.status, BatchStatus::Blocked);
    assert!(!outcome.issues.is_empty());
}

#[test]
fn identical_bytes_hash_identically() {
    let a = parse(&format!("51824753556,{SMALL}\n"));
    let b = parse(&format!("51824753556,{SMALL}\n"));
    let c = parse(&format!("44000000000,{SMALL}\n"));
    assert_eq!(a.file_hash, b.file_hash);
    assert_ne!(a.file_hash, c.file_hash);
}

#[test]
fn cancelled_import_creates_nothing() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = parse_results(b"51824753556,whatever\n", &cancel).expect_err("cancelled");
    assert!(matches!(err, ClassifyError::Cancelled));
}

fn staged_row(number: u64, abn: &str) -> StagedRow {
    let mut standard = BTreeMap::new();
    standard.insert(CanonicalField::PayeeAbn, FieldValue::Text(abn.to_string()));
    StagedRow {
        tenant: TenantId::new("acme").expect("tenant"),
        run: RunId::from_raw(1),
        row_number: RowNumber::new(number).expect("row number"),
        standard,
        custom: BTreeMap::new(),
        source_ref: String::new(),
        errors: Vec::new(),
        annotations: Annotations::default(),
    }
}

fn batch_for(outcome: &ptr_classify::ImportOutcome) -> ClassificationBatch {
    ClassificationBatch {
        id: ptr_model::BatchId::from_raw(7),
        tenant: TenantId::new("acme").expect("tenant"),
        run: RunId::from_raw(1),
        file_hash: outcome.file_hash.clone(),
        total_rows: outcome.total_rows,
        valid_rows: outcome.valid_rows,
        invalid_identifier_rows: outcome.invalid_identifier_rows,
        unrecognized_outcome_rows: outcome.unrecognized_outcome_rows,
        status: outcome.status,
        lifecycle: BatchLifecycle::Active,
        issues: outcome.issues.clone(),
    }
}

#[test]
fn matcher_attaches_verdict_and_evidence_reference() {
    let outcome = parse(&format!(
        "51824753556,{SMALL}\n44000000000,{NOT_SMALL}\n"
    ));
    let batch = batch_for(&outcome);
    let rows = vec![
        staged_row(1, "51 824 753 556"),
        staged_row(2, "44000000000"),
        staged_row(3, "99999999999"),
    ];
    let (annotations, summary) = match_rows(&batch, &outcome.results, &rows);
    assert_eq!(summary.matched_rows, 2);
    assert_eq!(summary.unmatched_rows, 1);
    assert_eq!(annotations.len(), 2);

    let (_, first) = &annotations[0];
    let mark = first.classification.expect("mark");
    assert!(mark.is_small_business);
    assert_eq!(mark.batch, batch.id);

    let (_, second) = &annotations[1];
    assert!(!second.classification.expect("mark").is_small_business);
}

#[test]
fn matcher_matches_invalid_identifiers_too() {
    let outcome = parse(&format!("518247,{SMALL}\n"));
    let batch = batch_for(&outcome);
    let rows = vec![staged_row(1, "518247")];
    let (annotations, summary) = match_rows(&batch, &outcome.results, &rows);
    assert_eq!(summary.matched_rows, 1);
    assert!(annotations[0].1.classification.is_some());
}
