//! Row staging.

use std::collections::BTreeMap;

use tracing::{debug, info};

use ptr_model::{
    Annotations, CancelToken, CanonicalField, CellError, Dataset, FieldValue, ParseStatus, RawRow,
    ResolvedColumnMap, Resolution, StagedRow,
};

use crate::error::StageError;
use crate::hash::staging_input_hash;

/// Rows between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 256;

/// The complete staged row set produced from one staging pass.
#[derive(Debug)]
pub struct StagingOutcome {
    pub rows: Vec<StagedRow>,
    /// Hex sha256 over mapping + raw rows; identical re-runs reproduce it.
    pub input_hash: String,
    /// Rows carrying at least one recorded cell error.
    pub error_rows: u64,
    /// Total recorded cell errors across the run.
    pub cell_errors: u64,
}

/// Stage every raw row of the main dataset through the resolved mapping.
///
/// One staged row per source row, in source order. Unparseable values are
/// set to `Missing` and recorded on the row; unresolved canonical fields
/// are recorded the same way. Only a dataset that never parsed at all is
/// fatal.
pub fn stage_rows(
    dataset: &Dataset,
    resolved: &ResolvedColumnMap,
    raw_rows: &[RawRow],
    cancel: &CancelToken,
) -> Result<StagingOutcome, StageError> {
    if let ParseStatus::Failed { reason } = &dataset.parse_status {
        return Err(StageError::DatasetUnparsed {
            reason: reason.clone(),
        });
    }

    let input_hash = staging_input_hash(resolved, raw_rows)?;
    let mut rows = Vec::with_capacity(raw_rows.len());
    let mut error_rows = 0u64;
    let mut cell_errors = 0u64;

    for (index, raw) in raw_rows.iter().enumerate() {
        if index % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }
        let row = stage_one(dataset, resolved, raw);
        if !row.errors.is_empty() {
            error_rows += 1;
            cell_errors += row.errors.len() as u64;
        }
        rows.push(row);
    }

    info!(
        run = %dataset.run,
        rows = rows.len(),
        error_rows,
        cell_errors,
        input_hash = %input_hash,
        "staged dataset"
    );
    Ok(StagingOutcome {
        rows,
        input_hash,
        error_rows,
        cell_errors,
    })
}

fn stage_one(dataset: &Dataset, resolved: &ResolvedColumnMap, raw: &RawRow) -> StagedRow {
    let mut standard: BTreeMap<CanonicalField, FieldValue> = BTreeMap::new();
    let mut custom: BTreeMap<String, FieldValue> = BTreeMap::new();
    let mut errors = Vec::new();

    for (header, value) in &raw.values {
        match resolved.columns.get(header) {
            Some(Resolution::Canonical {
                field,
                value_type,
                format,
            }) => match FieldValue::parse(value, *value_type, format.as_deref()) {
                Ok(parsed) => {
                    standard.insert(*field, parsed);
                }
                Err(err) => {
                    debug!(row = %raw.row_number, column = %header, "cell coercion failed");
                    errors.push(CellError::Coerce {
                        column: header.clone(),
                        raw: err.raw,
                        target: err.target,
                    });
                    standard.insert(*field, FieldValue::Missing);
                }
            },
            Some(Resolution::Passthrough { alias }) => {
                let key = alias.clone().unwrap_or_else(|| header.clone());
                let trimmed = value.trim();
                let cell = if trimmed.is_empty() {
                    FieldValue::Missing
                } else {
                    FieldValue::Text(trimmed.to_string())
                };
                custom.insert(key, cell);
            }
            // A column the resolver never saw (header drift between
            // preview and upload) is kept as plain passthrough.
            None => {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    custom.insert(header.clone(), FieldValue::Text(trimmed.to_string()));
                }
            }
        }
    }

    // Literal defaults fill fields with no bound column, and also fields
    // whose bound column was absent from this row.
    for (field, value) in &resolved.defaults {
        standard.entry(*field).or_insert_with(|| value.clone());
    }

    for field in &resolved.unresolved {
        standard.insert(*field, FieldValue::Missing);
        errors.push(CellError::Unresolved { field: *field });
    }

    StagedRow {
        tenant: dataset.tenant.clone(),
        run: dataset.run,
        row_number: raw.row_number,
        standard,
        custom,
        source_ref: format!("{}#{}", dataset.content_ref, raw.row_number),
        errors,
        annotations: Annotations::default(),
    }
}
