use std::collections::BTreeMap;

use ptr_model::{
    Annotations, BatchLifecycle, BatchStatus, ClassificationBatch, ClassificationResult, Dataset,
    DatasetRole, Outcome, ParseStatus, RawRow, RowNumber, Run, StagedRow, TenantId,
};
use ptr_store::{IdService, InMemoryStore, Store, StoreError};

fn tenant(name: &str) -> TenantId {
    TenantId::new(name).expect("tenant")
}

fn staged_row(run: &Run, number: u64) -> StagedRow {
    StagedRow {
        tenant: run.tenant.clone(),
        run: run.id,
        row_number: RowNumber::new(number).expect("row number"),
        standard: BTreeMap::new(),
        custom: BTreeMap::new(),
        source_ref: format!("ref#{number}"),
        errors: Vec::new(),
        annotations: Annotations::default(),
    }
}

fn batch(ids: &IdService, run: &Run, hash: &str) -> ClassificationBatch {
    ClassificationBatch {
        id: ids.next_batch_id(),
        tenant: run.tenant.clone(),
        run: run.id,
        file_hash: hash.to_string(),
        total_rows: 1,
        valid_rows: 1,
        invalid_identifier_rows: 0,
        unrecognized_outcome_rows: 0,
        status: BatchStatus::Applied,
        lifecycle: BatchLifecycle::Active,
        issues: Vec::new(),
    }
}

#[test]
fn wrong_tenant_lookup_is_not_found() {
    let store = InMemoryStore::new();
    let ids = IdService::new();
    let run = Run::new(ids.next_run_id(), tenant("acme"), None);
    store.insert_run(run.clone()).expect("insert run");

    assert!(store.get_run(&tenant("acme"), run.id).is_ok());
    assert_eq!(
        store.get_run(&tenant("other"), run.id),
        Err(StoreError::NotFound)
    );
    assert_eq!(
        store.staged_rows(&tenant("other"), run.id),
        Err(StoreError::NotFound)
    );
}

#[test]
fn replace_staged_rows_is_wholesale() {
    let store = InMemoryStore::new();
    let ids = IdService::new();
    let run = Run::new(ids.next_run_id(), tenant("acme"), None);
    store.insert_run(run.clone()).expect("insert run");

    store
        .replace_staged_rows(
            &run.tenant,
            run.id,
            vec![staged_row(&run, 1), staged_row(&run, 2), staged_row(&run, 3)],
        )
        .expect("first staging");
    store
        .replace_staged_rows(&run.tenant, run.id, vec![staged_row(&run, 1)])
        .expect("re-staging");

    let rows = store.staged_rows(&run.tenant, run.id).expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row_number.as_u64(), 1);
}

#[test]
fn write_annotations_rejects_unknown_rows() {
    let store = InMemoryStore::new();
    let ids = IdService::new();
    let run = Run::new(ids.next_run_id(), tenant("acme"), None);
    store.insert_run(run.clone()).expect("insert run");
    store
        .replace_staged_rows(&run.tenant, run.id, vec![staged_row(&run, 1)])
        .expect("staging");

    let mut bag = Annotations::default();
    bag.exclude("test");
    let stray = RowNumber::new(99).expect("row number");
    assert!(matches!(
        store.write_annotations(&run.tenant, run.id, vec![(stray, bag)]),
        Err(StoreError::Conflict(_))
    ));
}

#[test]
fn new_batch_supersedes_previous_active() {
    let store = InMemoryStore::new();
    let ids = IdService::new();
    let run = Run::new(ids.next_run_id(), tenant("acme"), None);
    store.insert_run(run.clone()).expect("insert run");

    let first = batch(&ids, &run, "hash-a");
    let second = batch(&ids, &run, "hash-b");
    store
        .insert_batch(
            first.clone(),
            vec![ClassificationResult {
                identifier: "51824753556".to_string(),
                outcome_text: "Small business for payment times reporting".to_string(),
                outcome: Outcome::SmallBusiness,
                is_valid_abn: true,
                year: None,
            }],
        )
        .expect("first batch");
    store.insert_batch(second.clone(), Vec::new()).expect("second batch");

    let latest = store
        .latest_batch(&run.tenant, run.id)
        .expect("latest")
        .expect("some batch");
    assert_eq!(latest.id, second.id);

    // Hash lookup answers for the active batch only; the superseded batch's
    // content no longer matches, so re-importing it would make a new batch.
    assert_eq!(
        store.batch_by_hash(&run.tenant, run.id, "hash-a").expect("by hash"),
        None
    );
    let by_hash = store
        .batch_by_hash(&run.tenant, run.id, "hash-b")
        .expect("by hash")
        .expect("some batch");
    assert_eq!(by_hash.id, second.id);
    // The superseded batch's results stay queryable by id.
    assert_eq!(
        store.batch_results(&run.tenant, first.id).expect("results").len(),
        1
    );
}

#[test]
fn dataset_lookup_by_role() {
    let store = InMemoryStore::new();
    let ids = IdService::new();
    let run = Run::new(ids.next_run_id(), tenant("acme"), None);
    store.insert_run(run.clone()).expect("insert run");

    let dataset = Dataset {
        id: ids.next_dataset_id(),
        tenant: run.tenant.clone(),
        run: run.id,
        role: DatasetRole::Main,
        filename: "payments.csv".to_string(),
        content_ref: "deadbeef".to_string(),
        row_count: 1,
        parse_status: ParseStatus::Parsed,
        headers: vec!["Amount".to_string()],
    };
    let row = RawRow::new(RowNumber::new(1).expect("row number")).with_value("Amount", "10");
    store.insert_dataset(dataset.clone(), vec![row]).expect("insert dataset");

    let found = store
        .dataset_by_role(&run.tenant, run.id, &DatasetRole::Main)
        .expect("main dataset");
    assert_eq!(found.id, dataset.id);
    let rows = store.dataset_rows(&run.tenant, dataset.id).expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].values.get("Amount").map(String::as_str),
        Some("10")
    );
}
