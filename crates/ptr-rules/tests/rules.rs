use std::collections::BTreeMap;

use proptest::prelude::proptest;

use ptr_model::{
    AggregateOp, Annotations, CanonicalField, CompareOp, DatasetJoinHint, DeriveExpr, FieldValue,
    Predicate, RawRow, ResolvedColumnMap, RowNumber, RuleDef, RunId, StagedRow, TenantId,
};
use ptr_rules::{LookupSources, RuleError, apply_rules};

fn row(number: u64, abn: &str, amount: f64) -> StagedRow {
    let mut standard = BTreeMap::new();
    standard.insert(
        CanonicalField::PayeeAbn,
        FieldValue::Text(abn.to_string()),
    );
    standard.insert(CanonicalField::PaymentAmount, FieldValue::Number(amount));
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

fn resolved(rules: Vec<RuleDef>) -> ResolvedColumnMap {
    ResolvedColumnMap {
        rules,
        ..Default::default()
    }
}

fn filter_negative() -> RuleDef {
    RuleDef::Filter {
        predicate: Predicate {
            field: "paymentAmount".to_string(),
            op: CompareOp::Lt,
            value: Some(FieldValue::Number(0.0)),
        },
        reason: "negative amount".to_string(),
    }
}

fn derive_abs() -> RuleDef {
    RuleDef::Derive {
        target: "paymentAmount".to_string(),
        expr: DeriveExpr::Abs {
            field: "paymentAmount".to_string(),
        },
    }
}

fn annotations_for(
    outcome: &ptr_rules::RuleOutcome,
    number: u64,
) -> &Annotations {
    let wanted = RowNumber::new(number).expect("row number");
    &outcome
        .annotations
        .iter()
        .find(|(row_number, _)| *row_number == wanted)
        .expect("row annotations")
        .1
}

#[test]
fn rules_apply_in_declared_order() {
    let rows = vec![row(1, "51824753556", -120.0), row(2, "44000000000", 80.0)];
    let lookups = LookupSources::new();

    // filter-then-derive: the negative row is excluded before abs runs.
    let outcome = apply_rules(
        &resolved(vec![filter_negative(), derive_abs()]),
        &rows,
        &lookups,
    )
    .expect("apply");
    assert_eq!(outcome.excluded_rows, 1);
    let first = annotations_for(&outcome, 1);
    assert!(first.excluded);
    assert_eq!(first.overrides.get("paymentAmount"), None);

    // derive-then-filter: abs removes the negative before the filter sees it.
    let outcome = apply_rules(
        &resolved(vec![derive_abs(), filter_negative()]),
        &rows,
        &lookups,
    )
    .expect("apply");
    assert_eq!(outcome.excluded_rows, 0);
    let first = annotations_for(&outcome, 1);
    assert!(!first.excluded);
    assert_eq!(
        first.overrides.get("paymentAmount"),
        Some(&FieldValue::Number(120.0))
    );
}

#[test]
fn exclusion_is_soft_and_reasoned() {
    let rows = vec![row(1, "51824753556", -120.0)];
    let outcome = apply_rules(&resolved(vec![filter_negative()]), &rows, &LookupSources::new())
        .expect("apply");
    let bag = annotations_for(&outcome, 1);
    assert!(bag.excluded);
    assert_eq!(bag.exclusion_reason.as_deref(), Some("negative amount"));
    // One annotation entry per staged row, excluded or not.
    assert_eq!(outcome.annotations.len(), 1);
}

#[test]
fn reapplying_rules_is_idempotent() {
    let rules = vec![filter_negative(), derive_abs()];
    let mut rows = vec![row(1, "51824753556", -120.0), row(2, "44000000000", 80.0)];
    let lookups = LookupSources::new();

    let first = apply_rules(&resolved(rules.clone()), &rows, &lookups).expect("first apply");
    // Simulate persistence of the annotation state, then re-apply.
    for (number, bag) in &first.annotations {
        let target = rows
            .iter_mut()
            .find(|row| row.row_number == *number)
            .expect("row");
        target.annotations = bag.clone();
    }
    let second = apply_rules(&resolved(rules), &rows, &lookups).expect("second apply");
    assert_eq!(first.annotations, second.annotations);
    assert_eq!(first.excluded_rows, second.excluded_rows);
}

#[test]
fn rename_and_cast_shadow_without_destroying_staged_values() {
    let mut source = row(1, "51824753556", 80.0);
    source.custom.insert(
        "terms".to_string(),
        FieldValue::Text("30".to_string()),
    );
    let rules = vec![
        RuleDef::Rename {
            from: "terms".to_string(),
            to: "paymentTermDays".to_string(),
        },
        RuleDef::Cast {
            field: "paymentTermDays".to_string(),
            to: ptr_model::ValueType::Integer,
            format: None,
        },
    ];
    let mut resolved = resolved(rules);
    resolved.columns.insert(
        "terms".to_string(),
        ptr_model::Resolution::Passthrough { alias: None },
    );
    let outcome = apply_rules(&resolved, &[source.clone()], &LookupSources::new()).expect("apply");
    let bag = annotations_for(&outcome, 1);
    assert_eq!(
        bag.overrides.get("paymentTermDays"),
        Some(&FieldValue::Integer(30))
    );
    // The staged custom bucket is untouched.
    assert_eq!(
        source.custom.get("terms"),
        Some(&FieldValue::Text("30".to_string()))
    );
}

#[test]
fn join_lookup_enriches_from_auxiliary_rows() {
    let rules = vec![RuleDef::JoinLookup {
        dataset: "vendor-master".to_string(),
        key_field: "payeeAbn".to_string(),
        match_column: "ABN".to_string(),
        take: BTreeMap::from([("Vendor Name".to_string(), "payeeName".to_string())]),
    }];
    let mut resolved = resolved(rules);
    resolved.joins.push(DatasetJoinHint {
        label: "vendor-master".to_string(),
        join_column: "ABN".to_string(),
    });
    let mut lookups = LookupSources::new();
    lookups.insert(
        "vendor-master".to_string(),
        vec![
            RawRow::new(RowNumber::new(1).expect("row number"))
                .with_value("ABN", "51824753556")
                .with_value("Vendor Name", "Example Pty Ltd"),
        ],
    );
    let rows = vec![row(1, "51824753556", 80.0), row(2, "44000000000", 10.0)];
    let outcome = apply_rules(&resolved, &rows, &lookups).expect("apply");
    assert_eq!(
        annotations_for(&outcome, 1).overrides.get("payeeName"),
        Some(&FieldValue::Text("Example Pty Ltd".to_string()))
    );
    assert_eq!(annotations_for(&outcome, 2).overrides.get("payeeName"), None);
}

#[test]
fn net_reversals_excludes_matched_pairs_only() {
    let rules = vec![RuleDef::NetReversals {
        group_by: vec!["payeeAbn".to_string()],
        amount_field: "paymentAmount".to_string(),
    }];
    let rows = vec![
        row(1, "51824753556", 500.0),
        row(2, "51824753556", -500.0),
        row(3, "51824753556", 500.0), // unmatched surplus stays in
        row(4, "44000000000", -500.0), // different group, no counterpart
    ];
    let outcome = apply_rules(&resolved(rules), &rows, &LookupSources::new()).expect("apply");
    assert_eq!(outcome.excluded_rows, 2);
    assert!(annotations_for(&outcome, 1).excluded);
    assert!(annotations_for(&outcome, 2).excluded);
    assert!(!annotations_for(&outcome, 3).excluded);
    assert!(!annotations_for(&outcome, 4).excluded);
}

#[test]
fn group_aggregate_writes_to_every_member() {
    let rules = vec![RuleDef::GroupAggregate {
        group_by: vec!["payeeAbn".to_string()],
        source_field: "paymentAmount".to_string(),
        target: "payeeTotal".to_string(),
        op: AggregateOp::Sum,
    }];
    let rows = vec![
        row(1, "51824753556", 100.0),
        row(2, "51824753556", 50.0),
        row(3, "44000000000", 7.0),
    ];
    let outcome = apply_rules(&resolved(rules), &rows, &LookupSources::new()).expect("apply");
    assert_eq!(
        annotations_for(&outcome, 1).overrides.get("payeeTotal"),
        Some(&FieldValue::Number(150.0))
    );
    assert_eq!(
        annotations_for(&outcome, 2).overrides.get("payeeTotal"),
        Some(&FieldValue::Number(150.0))
    );
    assert_eq!(
        annotations_for(&outcome, 3).overrides.get("payeeTotal"),
        Some(&FieldValue::Number(7.0))
    );
}

#[test]
fn cross_row_rules_skip_excluded_rows() {
    let rules = vec![
        filter_negative(),
        RuleDef::GroupAggregate {
            group_by: vec!["payeeAbn".to_string()],
            source_field: "paymentAmount".to_string(),
            target: "payeeTotal".to_string(),
            op: AggregateOp::Sum,
        },
    ];
    let rows = vec![row(1, "51824753556", 100.0), row(2, "51824753556", -40.0)];
    let outcome = apply_rules(&resolved(rules), &rows, &LookupSources::new()).expect("apply");
    // The excluded row neither contributes nor receives the aggregate.
    assert_eq!(
        annotations_for(&outcome, 1).overrides.get("payeeTotal"),
        Some(&FieldValue::Number(100.0))
    );
    assert_eq!(annotations_for(&outcome, 2).overrides.get("payeeTotal"), None);
}

#[test]
fn malformed_rule_rejects_whole_apply() {
    let rules = vec![
        derive_abs(),
        RuleDef::Filter {
            predicate: Predicate {
                field: "noSuchField".to_string(),
                op: CompareOp::IsMissing,
                value: None,
            },
            reason: "x".to_string(),
        },
    ];
    let rows = vec![row(1, "51824753556", -120.0)];
    let err =
        apply_rules(&resolved(rules), &rows, &LookupSources::new()).expect_err("config error");
    assert!(matches!(err, RuleError::UnknownField { index: 1, .. }));
}

#[test]
fn predicate_operand_is_required_for_ordered_ops() {
    let rules = vec![RuleDef::Filter {
        predicate: Predicate {
            field: "paymentAmount".to_string(),
            op: CompareOp::Lt,
            value: None,
        },
        reason: "x".to_string(),
    }];
    let err = apply_rules(&resolved(rules), &[], &LookupSources::new()).expect_err("config error");
    assert!(matches!(err, RuleError::MissingOperand { .. }));
}

proptest! {
    // Cross-row results must depend on group membership only, never on the
    // order rows happen to sit in the staged set.
    #[test]
    fn net_reversals_is_order_independent(seed in 0usize..24) {
        let mut rows = vec![
            row(1, "51824753556", 500.0),
            row(2, "51824753556", -500.0),
            row(3, "51824753556", 200.0),
            row(4, "44000000000", -500.0),
        ];
        // Rotate to permute order while keeping row numbers stable.
        let len = rows.len();
        rows.rotate_left(seed % len);
        let rules = vec![RuleDef::NetReversals {
            group_by: vec!["payeeAbn".to_string()],
            amount_field: "paymentAmount".to_string(),
        }];
        let outcome = apply_rules(&resolved(rules), &rows, &LookupSources::new()).expect("apply");
        let mut excluded: Vec<u64> = outcome
            .annotations
            .iter()
            .filter(|(_, bag)| bag.excluded)
            .map(|(number, _)| number.as_u64())
            .collect();
        excluded.sort_unstable();
        assert_eq!(excluded, vec![1, 2]);
    }
}
