//! The store contract the pipeline writes through.

use ptr_model::{
    Annotations, BatchId, ClassificationBatch, ClassificationResult, ColumnMapConfig, Dataset,
    DatasetId, DatasetRole, ProfileId, RawRow, RowNumber, Run, RunId, StagedRow, TenantId,
};

use crate::error::StoreError;

/// Tenant-scoped storage for runs, datasets, staged rows and batches.
///
/// Implementations must treat a wrong-tenant lookup exactly like a missing
/// id (`StoreError::NotFound`). Staged rows for a run are only ever
/// replaced wholesale, never patched in place.
pub trait Store: Send + Sync {
    fn insert_run(&self, run: Run) -> Result<(), StoreError>;
    fn get_run(&self, tenant: &TenantId, run: RunId) -> Result<Run, StoreError>;
    fn update_run(&self, run: Run) -> Result<(), StoreError>;

    /// Overwrite the run's live column-map configuration.
    fn put_column_map(
        &self,
        tenant: &TenantId,
        run: RunId,
        config: ColumnMapConfig,
    ) -> Result<(), StoreError>;
    fn get_column_map(&self, tenant: &TenantId, run: RunId)
    -> Result<ColumnMapConfig, StoreError>;

    fn put_profile_config(
        &self,
        tenant: &TenantId,
        profile: ProfileId,
        config: ColumnMapConfig,
    ) -> Result<(), StoreError>;
    fn get_profile_config(
        &self,
        tenant: &TenantId,
        profile: &ProfileId,
    ) -> Result<Option<ColumnMapConfig>, StoreError>;

    fn insert_dataset(&self, dataset: Dataset, rows: Vec<RawRow>) -> Result<(), StoreError>;
    fn dataset_by_role(
        &self,
        tenant: &TenantId,
        run: RunId,
        role: &DatasetRole,
    ) -> Result<Dataset, StoreError>;
    fn dataset_rows(&self, tenant: &TenantId, dataset: DatasetId)
    -> Result<Vec<RawRow>, StoreError>;

    /// Destructive replace: drop every staged row for the run, then insert.
    fn replace_staged_rows(
        &self,
        tenant: &TenantId,
        run: RunId,
        rows: Vec<StagedRow>,
    ) -> Result<(), StoreError>;
    fn staged_rows(&self, tenant: &TenantId, run: RunId) -> Result<Vec<StagedRow>, StoreError>;

    /// Overwrite the annotation bags for the addressed rows.
    fn write_annotations(
        &self,
        tenant: &TenantId,
        run: RunId,
        annotations: Vec<(RowNumber, Annotations)>,
    ) -> Result<(), StoreError>;

    /// Insert a new batch as the run's active one, superseding any prior
    /// active batch.
    fn insert_batch(
        &self,
        batch: ClassificationBatch,
        results: Vec<ClassificationResult>,
    ) -> Result<(), StoreError>;
    fn latest_batch(
        &self,
        tenant: &TenantId,
        run: RunId,
    ) -> Result<Option<ClassificationBatch>, StoreError>;
    /// The run's active batch, if its file hash matches. Superseded batches
    /// never match; re-importing their content makes a new batch.
    fn batch_by_hash(
        &self,
        tenant: &TenantId,
        run: RunId,
        file_hash: &str,
    ) -> Result<Option<ClassificationBatch>, StoreError>;
    fn batch_results(
        &self,
        tenant: &TenantId,
        batch: BatchId,
    ) -> Result<Vec<ClassificationResult>, StoreError>;
}
