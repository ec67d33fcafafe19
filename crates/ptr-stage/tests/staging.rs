use proptest::prelude::proptest;

use ptr_map::resolve;
use ptr_model::{
    CancelToken, CanonicalField, CellError, ColumnMapConfig, ColumnMapping, Dataset, DatasetId,
    DatasetRole, FieldValue, ParseStatus, RawRow, RowNumber, RunId, TenantId, ValueType,
};
use ptr_stage::{StageError, stage_rows};

fn dataset(headers: &[&str]) -> Dataset {
    Dataset {
        id: DatasetId::from_raw(1),
        tenant: TenantId::new("acme").expect("tenant"),
        run: RunId::from_raw(1),
        role: DatasetRole::Main,
        filename: "payments.csv".to_string(),
        content_ref: "cafe01".to_string(),
        row_count: 0,
        parse_status: ParseStatus::Parsed,
        headers: headers.iter().map(|h| (*h).to_string()).collect(),
    }
}

fn config() -> ColumnMapConfig {
    ColumnMapConfig {
        mappings: vec![
            ColumnMapping {
                source: "Supplier ABN".to_string(),
                field: CanonicalField::PayeeAbn,
                value_type: None,
                format: None,
            },
            ColumnMapping {
                source: "Amount".to_string(),
                field: CanonicalField::PaymentAmount,
                value_type: Some(ValueType::Number),
                format: None,
            },
            ColumnMapping {
                source: "Paid On".to_string(),
                field: CanonicalField::PaymentDate,
                value_type: Some(ValueType::Date),
                format: Some("%d/%m/%Y".to_string()),
            },
        ],
        ..Default::default()
    }
}

fn raw(number: u64, abn: &str, amount: &str, date: &str) -> RawRow {
    RawRow::new(RowNumber::new(number).expect("row number"))
        .with_value("Supplier ABN", abn)
        .with_value("Amount", amount)
        .with_value("Paid On", date)
}

#[test]
fn one_staged_row_per_source_row_with_typed_values() {
    let headers = ["Supplier ABN", "Amount", "Paid On"];
    let dataset = dataset(&headers);
    let resolved = resolve(&config(), None, &dataset.headers).expect("resolve");
    let rows = vec![
        raw(1, "51 824 753 556", "$1,200.00", "15/03/2024"),
        raw(2, "44000000000", "80.5", "16/03/2024"),
    ];
    let outcome = stage_rows(&dataset, &resolved, &rows, &CancelToken::new()).expect("stage");
    assert_eq!(outcome.rows.len(), 2);
    assert_eq!(outcome.error_rows, 0);

    let first = &outcome.rows[0];
    assert_eq!(
        first.standard.get(&CanonicalField::PaymentAmount),
        Some(&FieldValue::Number(1200.0))
    );
    assert!(matches!(
        first.standard.get(&CanonicalField::PaymentDate),
        Some(FieldValue::Date(_))
    ));
    assert_eq!(first.source_ref, "cafe01#1");
}

#[test]
fn coercion_failure_is_recorded_not_fatal() {
    let headers = ["Supplier ABN", "Amount", "Paid On"];
    let dataset = dataset(&headers);
    let resolved = resolve(&config(), None, &dataset.headers).expect("resolve");
    let rows = vec![raw(1, "51824753556", "not-a-number", "15/03/2024")];
    let outcome = stage_rows(&dataset, &resolved, &rows, &CancelToken::new()).expect("stage");
    assert_eq!(outcome.error_rows, 1);

    let row = &outcome.rows[0];
    assert_eq!(
        row.standard.get(&CanonicalField::PaymentAmount),
        Some(&FieldValue::Missing)
    );
    assert!(row.errors.iter().any(|e| matches!(
        e,
        CellError::Coerce { column, raw, .. } if column == "Amount" && raw == "not-a-number"
    )));
}

#[test]
fn unresolved_fields_are_recorded_per_row() {
    let headers = ["Amount"];
    let dataset = dataset(&headers);
    let config = ColumnMapConfig {
        mappings: vec![ColumnMapping {
            source: "Amount".to_string(),
            field: CanonicalField::PaymentAmount,
            value_type: Some(ValueType::Number),
            format: None,
        }],
        ..Default::default()
    };
    let resolved = resolve(&config, None, &dataset.headers).expect("resolve");
    let rows = vec![RawRow::new(RowNumber::new(1).expect("row number")).with_value("Amount", "10")];
    let outcome = stage_rows(&dataset, &resolved, &rows, &CancelToken::new()).expect("stage");
    let row = &outcome.rows[0];
    assert_eq!(
        row.standard.get(&CanonicalField::PayeeAbn),
        Some(&FieldValue::Missing)
    );
    assert!(row.errors.iter().any(|e| matches!(
        e,
        CellError::Unresolved { field } if *field == CanonicalField::PayeeAbn
    )));
}

#[test]
fn passthrough_columns_land_in_custom_under_alias() {
    let headers = ["Amount", "Cost Centre"];
    let dataset = dataset(&headers);
    let mut config = config();
    config.passthrough.push(ptr_model::PassthroughColumn {
        source: "Cost Centre".to_string(),
        alias: Some("costCentre".to_string()),
    });
    let resolved = resolve(&config, None, &dataset.headers).expect("resolve");
    let rows = vec![
        RawRow::new(RowNumber::new(1).expect("row number"))
            .with_value("Amount", "10")
            .with_value("Cost Centre", "OPS-7"),
    ];
    let outcome = stage_rows(&dataset, &resolved, &rows, &CancelToken::new()).expect("stage");
    assert_eq!(
        outcome.rows[0].custom.get("costCentre"),
        Some(&FieldValue::Text("OPS-7".to_string()))
    );
}

#[test]
fn unparsed_dataset_aborts_staging() {
    let mut dataset = dataset(&[]);
    dataset.parse_status = ParseStatus::Failed {
        reason: "bad encoding".to_string(),
    };
    let resolved = resolve(&ColumnMapConfig::default(), None, &[]).expect("resolve");
    let err = stage_rows(&dataset, &resolved, &[], &CancelToken::new()).expect_err("fatal");
    assert!(matches!(err, StageError::DatasetUnparsed { .. }));
}

#[test]
fn cancelled_staging_produces_nothing() {
    let headers = ["Amount"];
    let dataset = dataset(&headers);
    let resolved = resolve(&config(), None, &dataset.headers).expect("resolve");
    let rows = vec![RawRow::new(RowNumber::new(1).expect("row number")).with_value("Amount", "10")];
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = stage_rows(&dataset, &resolved, &rows, &cancel).expect_err("cancelled");
    assert!(matches!(err, StageError::Cancelled));
}

proptest! {
    // Re-staging the same dataset + mapping must reproduce the same rows,
    // the same errors, and the same input hash.
    #[test]
    fn staging_is_idempotent(cells in proptest::collection::vec(("[0-9 ]{0,14}", "[A-Za-z0-9$.,-]{0,10}"), 0..20)) {
        let headers = ["Supplier ABN", "Amount", "Paid On"];
        let dataset = dataset(&headers);
        let resolved = resolve(&config(), None, &dataset.headers).expect("resolve");
        let rows: Vec<RawRow> = cells
            .iter()
            .enumerate()
            .map(|(i, (abn, amount))| raw(i as u64 + 1, abn, amount, "15/03/2024"))
            .collect();
        let first = stage_rows(&dataset, &resolved, &rows, &CancelToken::new()).expect("stage");
        let second = stage_rows(&dataset, &resolved, &rows, &CancelToken::new()).expect("stage");
        assert_eq!(first.rows, second.rows);
        assert_eq!(first.input_hash, second.input_hash);
        assert_eq!(first.cell_errors, second.cell_errors);
    }
}
