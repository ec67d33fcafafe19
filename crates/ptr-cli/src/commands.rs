use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info_span, warn};

use ptr_cli::logging::redact_value;
use ptr_core::{PipelineEngine, RuleSummary, StageSummary, parse_csv};
use ptr_model::{
    Actor, CancelToken, CanonicalField, ClassificationBatch, DatasetRole, ParseStatus,
    ResolvedColumnMap, Run, TenantId, ValidationVerdict,
};
use ptr_store::{IdService, InMemoryStore, repository::load_config};

use crate::cli::{ResolveArgs, RunArgs};

/// Everything the `run` command committed, for the summary printer.
pub struct RunOutcome {
    pub run: Run,
    pub stage: StageSummary,
    pub rules: Option<RuleSummary>,
    pub batch: Option<ClassificationBatch>,
    pub verdict: ValidationVerdict,
}

pub fn run_pipeline(args: &RunArgs) -> Result<RunOutcome> {
    let tenant = TenantId::new(&args.tenant).context("invalid tenant")?;
    let actor = Actor::new("cli");
    let cancel = CancelToken::new();
    let span = info_span!("run", tenant = %tenant);
    let _guard = span.enter();

    let config = load_config(&args.map)?;
    let has_rules = !config.rules.is_empty();
    let engine = PipelineEngine::new(Arc::new(InMemoryStore::new()), Arc::new(IdService::new()));

    let run = engine.create_run(&tenant, None, &actor)?;
    let bytes = read_file(&args.data)?;
    engine.register_dataset(
        &tenant,
        run.id,
        DatasetRole::Main,
        &display_name(&args.data),
        &bytes,
        &actor,
    )?;
    for spec in &args.aux {
        let (label, path) = split_aux(spec)?;
        let bytes = read_file(Path::new(path))?;
        engine.register_dataset(
            &tenant,
            run.id,
            DatasetRole::Auxiliary {
                label: label.to_string(),
            },
            &display_name(Path::new(path)),
            &bytes,
            &actor,
        )?;
    }
    engine.submit_column_map(&tenant, run.id, config, &actor)?;

    let stage = engine.stage_run(&tenant, run.id, &cancel, &actor)?;
    if !stage.unresolved.is_empty() {
        warn!(fields = ?stage.unresolved, "canonical fields left unresolved");
    }
    let rules = if has_rules && !args.no_rules {
        Some(engine.apply_rules(&tenant, run.id, &actor)?)
    } else {
        None
    };

    let batch = match &args.classification {
        Some(path) => {
            let bytes = read_file(path)?;
            let batch = engine.import_classification(&tenant, run.id, &bytes, &cancel, &actor)?;
            for issue in &batch.issues {
                debug!(
                    line = issue.line,
                    message = %redact_value(&issue.message),
                    "classification import issue"
                );
            }
            Some(batch)
        }
        None => None,
    };

    let verdict = engine.validation_verdict(&tenant, run.id)?;
    Ok(RunOutcome {
        run,
        stage,
        rules,
        batch,
        verdict,
    })
}

/// Resolve a column map against a dataset's headers without running
/// anything. Pure preview.
pub fn run_resolve(args: &ResolveArgs) -> Result<ResolvedColumnMap> {
    let bytes = read_file(&args.data)?;
    let upload = parse_csv(&bytes);
    if let ParseStatus::Failed { reason } = upload.parse_status {
        bail!("{} did not parse: {reason}", args.data.display());
    }
    let config = load_config(&args.map)?;
    let resolved = ptr_map::resolve(&config, None, &upload.headers)?;
    Ok(resolved)
}

/// The canonical reporting schema, in schema order.
pub fn canonical_fields() -> impl Iterator<Item = CanonicalField> {
    CanonicalField::ALL.into_iter()
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.csv")
        .to_string()
}

fn split_aux(spec: &str) -> Result<(&str, &str)> {
    match spec.split_once('=') {
        Some((label, path)) if !label.is_empty() && !path.is_empty() => Ok((label, path)),
        _ => bail!("--aux expects LABEL=PATH, got {spec:?}"),
    }
}
