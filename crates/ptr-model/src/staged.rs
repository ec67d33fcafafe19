//! Staged rows: the canonical unit of work.
//!
//! A staged row's `standard` and `custom` buckets are written once by the
//! staging engine and never mutated afterwards. Rules and classification
//! matching write only into the `annotations` bag, so re-applying either is
//! a matter of resetting the relevant part of the bag and running again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::abn::normalize_abn;
use crate::field::{CanonicalField, FieldValue};
use crate::ids::{BatchId, RowNumber, RunId, TenantId};

/// A per-row staging problem, recorded instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellError {
    /// A raw value that would not coerce to its declared type.
    Coerce {
        column: String,
        raw: String,
        target: String,
    },
    /// A canonical field with no mapping, fallback, or default.
    Unresolved { field: CanonicalField },
}

/// Classification evidence attached to a row by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationMark {
    pub is_small_business: bool,
    /// The batch this verdict came from. The gate checks it against the
    /// latest batch to catch rows classified by a superseded import.
    pub batch: BatchId,
}

/// The mutable annotation bag on a staged row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    /// Rule-written values, shadowing staged values by field name.
    #[serde(default)]
    pub overrides: BTreeMap<String, FieldValue>,
    /// Soft exclusion flag. Excluded rows stay inspectable.
    #[serde(default)]
    pub excluded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationMark>,
}

impl Annotations {
    /// Drop everything rules wrote, keeping classification evidence.
    ///
    /// Rule application starts from this baseline so that re-applying an
    /// edited rule list is idempotent without re-staging.
    pub fn reset_rule_state(&mut self) {
        self.overrides.clear();
        self.excluded = false;
        self.exclusion_reason = None;
    }

    pub fn exclude(&mut self, reason: impl Into<String>) {
        self.excluded = true;
        self.exclusion_reason = Some(reason.into());
    }
}

/// One staged row, addressed by `(tenant, run, row number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedRow {
    pub tenant: TenantId,
    pub run: RunId,
    pub row_number: RowNumber,
    /// Canonical field values.
    pub standard: BTreeMap<CanonicalField, FieldValue>,
    /// Passthrough values, keyed by alias (or original header).
    pub custom: BTreeMap<String, FieldValue>,
    /// Reference back to the raw payload (dataset content ref + row number).
    pub source_ref: String,
    /// Row-level staging problems.
    #[serde(default)]
    pub errors: Vec<CellError>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl StagedRow {
    /// The value a rule or the gate sees for a field name.
    ///
    /// Annotation overrides shadow staged values; canonical fields are
    /// addressed by their camelCase schema name, passthrough columns by
    /// alias. An unknown name reads as `Missing`.
    pub fn effective(&self, name: &str) -> FieldValue {
        if let Some(value) = self.annotations.overrides.get(name) {
            return value.clone();
        }
        if let Ok(field) = name.parse::<CanonicalField>()
            && let Some(value) = self.standard.get(&field)
        {
            return value.clone();
        }
        self.custom.get(name).cloned().unwrap_or(FieldValue::Missing)
    }

    /// Normalized payee identifier, if the row has one.
    pub fn payee_abn(&self) -> Option<String> {
        match self.effective(CanonicalField::PayeeAbn.as_str()) {
            FieldValue::Text(text) => {
                let normalized = normalize_abn(&text);
                if normalized.is_empty() {
                    None
                } else {
                    Some(normalized)
                }
            }
            FieldValue::Integer(value) => Some(value.to_string()),
            _ => None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        self.annotations.excluded
    }
}
