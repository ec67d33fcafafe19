//! Column-map configuration and its per-run resolved form.
//!
//! A tenant submits a `ColumnMapConfig` describing how their export's
//! columns relate to the canonical schema. The mapping resolver combines it
//! with profile defaults and the actual headers of the uploaded main
//! dataset to produce a `ResolvedColumnMap`, which is what staging and the
//! preview UI consume. Exactly one live config exists per run; resubmission
//! overwrites it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::{CanonicalField, FieldValue, ValueType};
use crate::rules::RuleDef;

/// One declared source-column -> canonical-field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Source header as the tenant spelled it.
    pub source: String,
    pub field: CanonicalField,
    /// Declared value type; the field's default type when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    /// Explicit parse format (dates only, chrono strftime syntax).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A source column kept verbatim under an optional alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassthroughColumn {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// One entry in a canonical field's fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackEntry {
    /// Bind to this alternate header if present in the dataset.
    Header { header: String },
    /// Stop walking and use this literal value.
    Default { value: FieldValue },
}

/// Declares an auxiliary dataset that `join_lookup` rules may reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetJoinHint {
    /// Label matching the auxiliary dataset's role.
    pub label: String,
    /// Column in the auxiliary dataset that identifies its rows.
    pub join_column: String,
}

/// The mapping configuration submitted for a run (or stored on a profile).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapConfig {
    #[serde(default)]
    pub mappings: Vec<ColumnMapping>,
    #[serde(default)]
    pub passthrough: Vec<PassthroughColumn>,
    /// Ordered alternates consulted when a field has no direct mapping.
    #[serde(default)]
    pub fallbacks: BTreeMap<CanonicalField, Vec<FallbackEntry>>,
    /// Run-level default values, lowest precedence.
    #[serde(default)]
    pub defaults: BTreeMap<CanonicalField, FieldValue>,
    #[serde(default)]
    pub joins: Vec<DatasetJoinHint>,
    /// Ordered rule list applied after staging.
    #[serde(default)]
    pub rules: Vec<RuleDef>,
}

/// What a source header resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Canonical {
        field: CanonicalField,
        value_type: ValueType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Passthrough {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
}

/// The fully resolved mapping for one run.
///
/// Pure output of the resolver: deterministic for identical configuration
/// and header list, and free of side effects, so it backs both staging and
/// the preview rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedColumnMap {
    /// Every header present in the main dataset, in dataset order.
    pub headers: Vec<String>,
    /// Resolution per header. Headers nobody claimed are passthrough.
    pub columns: BTreeMap<String, Resolution>,
    /// Literal defaults for canonical fields with no bound column.
    pub defaults: BTreeMap<CanonicalField, FieldValue>,
    /// Canonical fields with no column, no fallback, and no default.
    pub unresolved: Vec<CanonicalField>,
    pub joins: Vec<DatasetJoinHint>,
    pub rules: Vec<RuleDef>,
}

impl ResolvedColumnMap {
    /// The header bound to a canonical field, if any.
    pub fn header_for(&self, field: CanonicalField) -> Option<&str> {
        self.columns.iter().find_map(|(header, resolution)| {
            match resolution {
                Resolution::Canonical { field: bound, .. } if *bound == field => {
                    Some(header.as_str())
                }
                _ => None,
            }
        })
    }
}
