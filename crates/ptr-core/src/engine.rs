//! The pipeline engine.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow, ensure};
use tracing::info;

use ptr_classify::{match_rows, parse_results};
use ptr_model::{
    Actor, BatchLifecycle, CancelToken, CanonicalField, ClassificationBatch, ColumnMapConfig,
    Dataset, DatasetRole, ProfileId, ResolvedColumnMap, Run, RunId, RunStatus, RunStep, StagedRow,
    TenantId, ValidationVerdict,
};
use ptr_rules::LookupSources;
use ptr_store::{IdService, Store};

use crate::ingest;

/// What one staging pass committed.
#[derive(Debug)]
pub struct StageSummary {
    pub staged_rows: u64,
    pub error_rows: u64,
    pub cell_errors: u64,
    pub input_hash: String,
    /// Canonical fields left without any source, recorded per row as errors.
    pub unresolved: Vec<CanonicalField>,
}

/// What one rule application committed.
#[derive(Debug)]
pub struct RuleSummary {
    pub rows: u64,
    pub excluded_rows: u64,
}

/// Orchestrates the pipeline over the store seam.
///
/// Every operation that touches a run takes that run's lock first, so steps
/// for one run are strictly serialized while unrelated runs proceed in
/// parallel. Commits are wholesale: a failed or cancelled step leaves the
/// previously committed state untouched.
pub struct PipelineEngine {
    store: Arc<dyn Store>,
    ids: Arc<IdService>,
    locks: Mutex<BTreeMap<RunId, Arc<Mutex<()>>>>,
}

impl PipelineEngine {
    pub fn new(store: Arc<dyn Store>, ids: Arc<IdService>) -> Self {
        Self {
            store,
            ids,
            locks: Mutex::new(BTreeMap::new()),
        }
    }

    fn run_lock(&self, run: RunId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| anyhow!("run lock table poisoned"))?;
        Ok(locks.entry(run).or_default().clone())
    }

    fn active_run(&self, tenant: &TenantId, run: RunId) -> Result<Run> {
        let state = self
            .store
            .get_run(tenant, run)
            .with_context(|| format!("run {run} not found for tenant {tenant}"))?;
        ensure!(state.is_active(), "run {run} is retired");
        Ok(state)
    }

    /// Resolve the run's live column map against the main dataset's headers.
    fn resolved_map(&self, tenant: &TenantId, state: &Run) -> Result<(ResolvedColumnMap, Dataset)> {
        let config = self
            .store
            .get_column_map(tenant, state.id)
            .context("no column map submitted for this run")?;
        let profile = match &state.profile {
            Some(profile) => self.store.get_profile_config(tenant, profile)?,
            None => None,
        };
        let dataset = self
            .store
            .dataset_by_role(tenant, state.id, &DatasetRole::Main)
            .context("no main dataset registered for this run")?;
        let resolved = ptr_map::resolve(&config, profile.as_ref(), &dataset.headers)?;
        Ok((resolved, dataset))
    }

    fn lookup_sources(
        &self,
        tenant: &TenantId,
        run: RunId,
        resolved: &ResolvedColumnMap,
    ) -> Result<LookupSources> {
        let mut lookups = LookupSources::new();
        for hint in &resolved.joins {
            let role = DatasetRole::Auxiliary {
                label: hint.label.clone(),
            };
            let dataset = self
                .store
                .dataset_by_role(tenant, run, &role)
                .with_context(|| format!("auxiliary dataset {:?} not registered", hint.label))?;
            let rows = self.store.dataset_rows(tenant, dataset.id)?;
            lookups.insert(hint.label.clone(), rows);
        }
        Ok(lookups)
    }

    pub fn create_run(
        &self,
        tenant: &TenantId,
        profile: Option<ProfileId>,
        actor: &Actor,
    ) -> Result<Run> {
        let id = self.ids.next_run_id();
        let run = Run::new(id, tenant.clone(), profile);
        self.store.insert_run(run.clone())?;
        info!(%tenant, run = %id, %actor, "run created");
        Ok(run)
    }

    /// Submit (or resubmit) the run's column-map configuration.
    ///
    /// The rule list is validated against the main dataset's headers when
    /// that dataset is already registered; otherwise validation happens at
    /// staging, where headers first become available. Resubmission drops
    /// every staged row — they were built from the old mapping.
    pub fn submit_column_map(
        &self,
        tenant: &TenantId,
        run: RunId,
        config: ColumnMapConfig,
        actor: &Actor,
    ) -> Result<()> {
        let lock = self.run_lock(run)?;
        let _guard = lock.lock().map_err(|_| anyhow!("run {run} lock poisoned"))?;

        let mut state = self.active_run(tenant, run)?;
        if let Ok(dataset) = self.store.dataset_by_role(tenant, run, &DatasetRole::Main) {
            let profile = match &state.profile {
                Some(profile) => self.store.get_profile_config(tenant, profile)?,
                None => None,
            };
            let resolved = ptr_map::resolve(&config, profile.as_ref(), &dataset.headers)?;
            ptr_rules::validate_rules(&resolved.rules, &resolved)?;
        }
        self.store.put_column_map(tenant, run, config)?;
        self.store.replace_staged_rows(tenant, run, Vec::new())?;
        state.step = RunStep::Mapped;
        self.store.update_run(state)?;
        info!(%tenant, %run, %actor, "column map submitted");
        Ok(())
    }

    /// Register an uploaded file. A failed parse is recorded on the
    /// dataset, not rejected; staging is where it becomes fatal.
    pub fn register_dataset(
        &self,
        tenant: &TenantId,
        run: RunId,
        role: DatasetRole,
        filename: &str,
        bytes: &[u8],
        actor: &Actor,
    ) -> Result<Dataset> {
        let lock = self.run_lock(run)?;
        let _guard = lock.lock().map_err(|_| anyhow!("run {run} lock poisoned"))?;

        self.active_run(tenant, run)?;
        let upload = ingest::parse_csv(bytes);
        let dataset = Dataset {
            id: self.ids.next_dataset_id(),
            tenant: tenant.clone(),
            run,
            role,
            filename: filename.to_string(),
            content_ref: upload.content_ref,
            row_count: upload.rows.len() as u64,
            parse_status: upload.parse_status,
            headers: upload.headers,
        };
        self.store.insert_dataset(dataset.clone(), upload.rows)?;
        info!(
            %tenant,
            %run,
            %actor,
            dataset = %dataset.id,
            role = dataset.role.label(),
            rows = dataset.row_count,
            "dataset registered"
        );
        Ok(dataset)
    }

    /// Stage the main dataset through the resolved mapping, replacing the
    /// run's staged row set wholesale.
    pub fn stage_run(
        &self,
        tenant: &TenantId,
        run: RunId,
        cancel: &CancelToken,
        actor: &Actor,
    ) -> Result<StageSummary> {
        let lock = self.run_lock(run)?;
        let _guard = lock.lock().map_err(|_| anyhow!("run {run} lock poisoned"))?;

        let mut state = self.active_run(tenant, run)?;
        let (resolved, dataset) = self.resolved_map(tenant, &state)?;
        ptr_rules::validate_rules(&resolved.rules, &resolved)?;
        let raw = self.store.dataset_rows(tenant, dataset.id)?;
        let outcome = ptr_stage::stage_rows(&dataset, &resolved, &raw, cancel)?;

        let summary = StageSummary {
            staged_rows: outcome.rows.len() as u64,
            error_rows: outcome.error_rows,
            cell_errors: outcome.cell_errors,
            input_hash: outcome.input_hash,
            unresolved: resolved.unresolved.clone(),
        };
        self.store.replace_staged_rows(tenant, run, outcome.rows)?;
        state.step = RunStep::Staged;
        self.store.update_run(state)?;
        info!(
            %tenant,
            %run,
            %actor,
            rows = summary.staged_rows,
            error_rows = summary.error_rows,
            "run staged"
        );
        Ok(summary)
    }

    /// Apply the run's rule list to its staged rows.
    pub fn apply_rules(&self, tenant: &TenantId, run: RunId, actor: &Actor) -> Result<RuleSummary> {
        let lock = self.run_lock(run)?;
        let _guard = lock.lock().map_err(|_| anyhow!("run {run} lock poisoned"))?;

        let mut state = self.active_run(tenant, run)?;
        ensure!(state.step >= RunStep::Staged, "run {run} has not been staged");
        let (resolved, _) = self.resolved_map(tenant, &state)?;
        let rows = self.store.staged_rows(tenant, run)?;
        let lookups = self.lookup_sources(tenant, run, &resolved)?;
        let outcome = ptr_rules::apply_rules(&resolved, &rows, &lookups)?;

        let summary = RuleSummary {
            rows: outcome.annotations.len() as u64,
            excluded_rows: outcome.excluded_rows,
        };
        self.store.write_annotations(tenant, run, outcome.annotations)?;
        state.step = RunStep::Ruled;
        self.store.update_run(state)?;
        info!(
            %tenant,
            %run,
            %actor,
            excluded = summary.excluded_rows,
            "rules applied"
        );
        Ok(summary)
    }

    /// Import a classification file and match its results onto staged rows.
    ///
    /// Idempotent by file hash: re-importing the bytes behind the active
    /// batch returns that batch without creating anything. Any other
    /// content, including a previously superseded file, becomes a new batch
    /// that supersedes the prior active one. A file yielding no usable rows
    /// is recorded as a `Blocked` batch and nothing is matched.
    pub fn import_classification(
        &self,
        tenant: &TenantId,
        run: RunId,
        bytes: &[u8],
        cancel: &CancelToken,
        actor: &Actor,
    ) -> Result<ClassificationBatch> {
        let lock = self.run_lock(run)?;
        let _guard = lock.lock().map_err(|_| anyhow!("run {run} lock poisoned"))?;

        let mut state = self.active_run(tenant, run)?;
        ensure!(state.step >= RunStep::Staged, "run {run} has not been staged");
        let outcome = parse_results(bytes, cancel)?;
        if let Some(existing) = self.store.batch_by_hash(tenant, run, &outcome.file_hash)? {
            info!(
                %tenant,
                %run,
                %actor,
                batch = %existing.id,
                "identical classification file already imported"
            );
            return Ok(existing);
        }

        let batch = ClassificationBatch {
            id: self.ids.next_batch_id(),
            tenant: tenant.clone(),
            run,
            file_hash: outcome.file_hash,
            total_rows: outcome.total_rows,
            valid_rows: outcome.valid_rows,
            invalid_identifier_rows: outcome.invalid_identifier_rows,
            unrecognized_outcome_rows: outcome.unrecognized_outcome_rows,
            status: outcome.status,
            lifecycle: BatchLifecycle::Active,
            issues: outcome.issues,
        };
        let annotations = if batch.status.is_acceptable() {
            let rows = self.store.staged_rows(tenant, run)?;
            let (annotations, summary) = match_rows(&batch, &outcome.results, &rows);
            info!(
                %tenant,
                %run,
                %actor,
                batch = %batch.id,
                matched = summary.matched_rows,
                unmatched = summary.unmatched_rows,
                "classification imported"
            );
            Some(annotations)
        } else {
            info!(%tenant, %run, %actor, batch = %batch.id, "classification import blocked");
            None
        };
        self.store.insert_batch(batch.clone(), outcome.results)?;
        if let Some(annotations) = annotations {
            self.store.write_annotations(tenant, run, annotations)?;
            state.step = RunStep::Classified;
            self.store.update_run(state)?;
        }
        Ok(batch)
    }

    /// Compute the gate verdict from the run's current state.
    ///
    /// Verdicts are derived, never stored; a clean verdict on a fully
    /// classified run advances the step marker to `Validated`.
    pub fn validation_verdict(&self, tenant: &TenantId, run: RunId) -> Result<ValidationVerdict> {
        let lock = self.run_lock(run)?;
        let _guard = lock.lock().map_err(|_| anyhow!("run {run} lock poisoned"))?;

        let state = self.store.get_run(tenant, run)?;
        let rows = self.store.staged_rows(tenant, run)?;
        let latest = self.store.latest_batch(tenant, run)?;
        let results = match &latest {
            Some(batch) => self.store.batch_results(tenant, batch.id)?,
            None => Vec::new(),
        };
        let verdict = ptr_validate::compute_verdict(&rows, latest.as_ref(), &results);
        if state.is_active() && state.step == RunStep::Classified && verdict.status.allows_report()
        {
            let mut state = state;
            state.step = RunStep::Validated;
            self.store.update_run(state)?;
        }
        Ok(verdict)
    }

    /// The run's staged rows, optionally hiding soft-excluded ones.
    pub fn staged_rows(
        &self,
        tenant: &TenantId,
        run: RunId,
        include_excluded: bool,
    ) -> Result<Vec<StagedRow>> {
        let lock = self.run_lock(run)?;
        let _guard = lock.lock().map_err(|_| anyhow!("run {run} lock poisoned"))?;

        let mut rows = self.store.staged_rows(tenant, run)?;
        if !include_excluded {
            rows.retain(|row| !row.is_excluded());
        }
        Ok(rows)
    }

    /// Retire a run. Nothing is deleted; the run just refuses new work.
    pub fn retire_run(&self, tenant: &TenantId, run: RunId, actor: &Actor) -> Result<()> {
        let lock = self.run_lock(run)?;
        {
            let _guard = lock.lock().map_err(|_| anyhow!("run {run} lock poisoned"))?;
            let mut state = self.store.get_run(tenant, run)?;
            state.status = RunStatus::Retired;
            self.store.update_run(state)?;
            info!(%tenant, %run, %actor, "run retired");
        }
        // A retired run takes no further work, so its lock entry is dead
        // weight. A straggler holding the old Arc still fails the
        // active-run check.
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| anyhow!("run lock table poisoned"))?;
        locks.remove(&run);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ptr_model::{Actor, TenantId};
    use ptr_store::{IdService, InMemoryStore};

    use super::PipelineEngine;

    #[test]
    fn retiring_a_run_prunes_its_lock_entry() {
        let engine =
            PipelineEngine::new(Arc::new(InMemoryStore::new()), Arc::new(IdService::new()));
        let tenant = TenantId::new("acme").expect("tenant");
        let actor = Actor::new("test");
        let run = engine.create_run(&tenant, None, &actor).expect("create");

        engine.staged_rows(&tenant, run.id, true).expect("rows");
        assert!(engine.locks.lock().expect("locks").contains_key(&run.id));

        engine.retire_run(&tenant, run.id, &actor).expect("retire");
        assert!(engine.locks.lock().expect("locks").is_empty());
    }
}
