use thiserror::Error;

/// Rule configuration errors.
///
/// Any of these rejects the whole apply; rules never fail per row. Indexes
/// are 0-based positions in the declared rule list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule {index} ({kind}): unknown field {field:?}")]
    UnknownField {
        index: usize,
        kind: &'static str,
        field: String,
    },
    #[error("rule {index} ({kind}): predicate operator requires a value")]
    MissingOperand { index: usize, kind: &'static str },
    #[error("rule {index} ({kind}): group_by must not be empty")]
    EmptyGroupBy { index: usize, kind: &'static str },
    #[error("rule {index} (join_lookup): no dataset-join hint labelled {label:?}")]
    UnknownJoinDataset { index: usize, label: String },
    #[error("rule {index} (join_lookup): take must not be empty")]
    EmptyTake { index: usize },
    #[error("join_lookup dataset {label:?} has no rows loaded")]
    LookupSourceMissing { label: String },
}
