//! Rule configuration: a closed tagged union per rule kind.
//!
//! Rule lists travel inside the column-map configuration as JSON. Unknown
//! kinds or missing required fields fail deserialization outright, so a
//! malformed rule set is a configuration error before any row is touched.
//!
//! Rules reference fields by name: canonical fields by their camelCase
//! schema name, passthrough columns by alias, derived fields by the name a
//! `derive` rule gave them.

use serde::{Deserialize, Serialize};

use crate::field::{FieldValue, ValueType};

/// Comparison operator for filter predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    IsMissing,
}

/// A predicate over one effective field of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: CompareOp,
    /// Comparison operand. Not required for `is_missing`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

/// Expression for a `derive` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DeriveExpr {
    /// Absolute value of a numeric field.
    Abs { field: String },
    /// Copy another field verbatim.
    Copy { field: String },
    /// Join several fields' rendered values with a separator.
    Concat {
        fields: Vec<String>,
        #[serde(default)]
        separator: String,
    },
    /// Whole days from `start` to `end` (both date fields).
    DaysBetween { start: String, end: String },
    /// A literal value.
    Constant { value: FieldValue },
}

/// Aggregation operator for `group_aggregate` cross-row rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    Sum,
    Count,
    Min,
    Max,
}

/// One rule in a run's ordered rule list.
///
/// `filter`, `derive`, `rename`, `cast` and `join_lookup` are row rules and
/// execute strictly in declared order. `net_reversals` and
/// `group_aggregate` are cross-row rules and run after every row rule has
/// settled, over non-excluded rows only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleDef {
    /// Soft-exclude rows matching a predicate.
    Filter { predicate: Predicate, reason: String },
    /// Compute a new annotation field from existing ones.
    Derive { target: String, expr: DeriveExpr },
    /// Expose an existing field under a new name.
    Rename { from: String, to: String },
    /// Re-coerce a field to a declared type.
    Cast {
        field: String,
        to: ValueType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    /// Enrich from an auxiliary dataset by key.
    JoinLookup {
        /// Auxiliary dataset label (matches a dataset-join hint).
        dataset: String,
        /// Field on the staged row whose value is the lookup key.
        key_field: String,
        /// Column in the auxiliary dataset matched against the key.
        match_column: String,
        /// Auxiliary column -> derived field name.
        take: std::collections::BTreeMap<String, String>,
    },
    /// Exclude equal-magnitude, opposite-sign pairs within a group.
    NetReversals {
        group_by: Vec<String>,
        amount_field: String,
    },
    /// Write a group-level aggregate onto every member row.
    GroupAggregate {
        group_by: Vec<String>,
        source_field: String,
        target: String,
        op: AggregateOp,
    },
}

impl RuleDef {
    /// Cross-row rules need whole groups available before evaluating.
    pub fn is_cross_row(&self) -> bool {
        matches!(self, Self::NetReversals { .. } | Self::GroupAggregate { .. })
    }

    /// Rule kind name as it appears in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Filter { .. } => "filter",
            Self::Derive { .. } => "derive",
            Self::Rename { .. } => "rename",
            Self::Cast { .. } => "cast",
            Self::JoinLookup { .. } => "join_lookup",
            Self::NetReversals { .. } => "net_reversals",
            Self::GroupAggregate { .. } => "group_aggregate",
        }
    }
}
