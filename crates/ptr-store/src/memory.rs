//! In-memory store backing the CLI and tests.

use std::collections::BTreeMap;
use std::sync::RwLock;

use ptr_model::{
    Annotations, BatchId, BatchLifecycle, ClassificationBatch, ClassificationResult,
    ColumnMapConfig, Dataset, DatasetId, DatasetRole, ProfileId, RawRow, RowNumber, Run, RunId,
    StagedRow, TenantId,
};

use crate::error::StoreError;
use crate::store::Store;

#[derive(Default)]
struct Inner {
    runs: BTreeMap<(TenantId, RunId), Run>,
    column_maps: BTreeMap<(TenantId, RunId), ColumnMapConfig>,
    profiles: BTreeMap<(TenantId, ProfileId), ColumnMapConfig>,
    datasets: BTreeMap<(TenantId, DatasetId), Dataset>,
    dataset_rows: BTreeMap<(TenantId, DatasetId), Vec<RawRow>>,
    staged: BTreeMap<(TenantId, RunId), Vec<StagedRow>>,
    batches: BTreeMap<(TenantId, BatchId), ClassificationBatch>,
    batch_results: BTreeMap<(TenantId, BatchId), Vec<ClassificationResult>>,
}

/// RwLock'd maps keyed by `(tenant, id)`.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for InMemoryStore {
    fn insert_run(&self, run: Run) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let key = (run.tenant.clone(), run.id);
        if inner.runs.contains_key(&key) {
            return Err(StoreError::Conflict(format!("run {} exists", run.id)));
        }
        inner.runs.insert(key, run);
        Ok(())
    }

    fn get_run(&self, tenant: &TenantId, run: RunId) -> Result<Run, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        inner
            .runs
            .get(&(tenant.clone(), run))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn update_run(&self, run: Run) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let key = (run.tenant.clone(), run.id);
        if !inner.runs.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        inner.runs.insert(key, run);
        Ok(())
    }

    fn put_column_map(
        &self,
        tenant: &TenantId,
        run: RunId,
        config: ColumnMapConfig,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if !inner.runs.contains_key(&(tenant.clone(), run)) {
            return Err(StoreError::NotFound);
        }
        inner.column_maps.insert((tenant.clone(), run), config);
        Ok(())
    }

    fn get_column_map(
        &self,
        tenant: &TenantId,
        run: RunId,
    ) -> Result<ColumnMapConfig, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        inner
            .column_maps
            .get(&(tenant.clone(), run))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn put_profile_config(
        &self,
        tenant: &TenantId,
        profile: ProfileId,
        config: ColumnMapConfig,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.profiles.insert((tenant.clone(), profile), config);
        Ok(())
    }

    fn get_profile_config(
        &self,
        tenant: &TenantId,
        profile: &ProfileId,
    ) -> Result<Option<ColumnMapConfig>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.profiles.get(&(tenant.clone(), profile.clone())).cloned())
    }

    fn insert_dataset(&self, dataset: Dataset, rows: Vec<RawRow>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let key = (dataset.tenant.clone(), dataset.id);
        if inner.datasets.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "dataset {} exists",
                dataset.id
            )));
        }
        inner.dataset_rows.insert(key.clone(), rows);
        inner.datasets.insert(key, dataset);
        Ok(())
    }

    fn dataset_by_role(
        &self,
        tenant: &TenantId,
        run: RunId,
        role: &DatasetRole,
    ) -> Result<Dataset, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        inner
            .datasets
            .values()
            .filter(|dataset| &dataset.tenant == tenant && dataset.run == run)
            .find(|dataset| &dataset.role == role)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn dataset_rows(
        &self,
        tenant: &TenantId,
        dataset: DatasetId,
    ) -> Result<Vec<RawRow>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        inner
            .dataset_rows
            .get(&(tenant.clone(), dataset))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn replace_staged_rows(
        &self,
        tenant: &TenantId,
        run: RunId,
        rows: Vec<StagedRow>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if !inner.runs.contains_key(&(tenant.clone(), run)) {
            return Err(StoreError::NotFound);
        }
        // Wholesale replacement; a prior staging's rows never survive.
        inner.staged.insert((tenant.clone(), run), rows);
        Ok(())
    }

    fn staged_rows(&self, tenant: &TenantId, run: RunId) -> Result<Vec<StagedRow>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        if !inner.runs.contains_key(&(tenant.clone(), run)) {
            return Err(StoreError::NotFound);
        }
        Ok(inner
            .staged
            .get(&(tenant.clone(), run))
            .cloned()
            .unwrap_or_default())
    }

    fn write_annotations(
        &self,
        tenant: &TenantId,
        run: RunId,
        annotations: Vec<(RowNumber, Annotations)>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let rows = inner
            .staged
            .get_mut(&(tenant.clone(), run))
            .ok_or(StoreError::NotFound)?;
        let mut by_number: BTreeMap<RowNumber, Annotations> = annotations.into_iter().collect();
        for row in rows.iter_mut() {
            if let Some(bag) = by_number.remove(&row.row_number) {
                row.annotations = bag;
            }
        }
        if let Some(stray) = by_number.into_keys().next() {
            return Err(StoreError::Conflict(format!(
                "annotation for unknown row {stray}"
            )));
        }
        Ok(())
    }

    fn insert_batch(
        &self,
        batch: ClassificationBatch,
        results: Vec<ClassificationResult>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let key = (batch.tenant.clone(), batch.id);
        if inner.batches.contains_key(&key) {
            return Err(StoreError::Conflict(format!("batch {} exists", batch.id)));
        }
        // The new batch supersedes whichever batch was active for the run.
        for existing in inner.batches.values_mut() {
            if existing.tenant == batch.tenant
                && existing.run == batch.run
                && existing.lifecycle == BatchLifecycle::Active
            {
                existing.lifecycle = BatchLifecycle::Superseded;
            }
        }
        inner.batch_results.insert(key.clone(), results);
        inner.batches.insert(key, batch);
        Ok(())
    }

    fn latest_batch(
        &self,
        tenant: &TenantId,
        run: RunId,
    ) -> Result<Option<ClassificationBatch>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .batches
            .values()
            .filter(|batch| {
                &batch.tenant == tenant
                    && batch.run == run
                    && batch.lifecycle == BatchLifecycle::Active
            })
            .max_by_key(|batch| batch.id)
            .cloned())
    }

    fn batch_by_hash(
        &self,
        tenant: &TenantId,
        run: RunId,
        file_hash: &str,
    ) -> Result<Option<ClassificationBatch>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        // Only the active batch counts: re-uploading content that was since
        // superseded must produce a fresh batch, not hand back a dead one.
        Ok(inner
            .batches
            .values()
            .filter(|batch| {
                &batch.tenant == tenant
                    && batch.run == run
                    && batch.lifecycle == BatchLifecycle::Active
            })
            .find(|batch| batch.file_hash == file_hash)
            .cloned())
    }

    fn batch_results(
        &self,
        tenant: &TenantId,
        batch: BatchId,
    ) -> Result<Vec<ClassificationResult>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        inner
            .batch_results
            .get(&(tenant.clone(), batch))
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}
