use thiserror::Error;

/// Fatal staging failures.
///
/// Per-row type-coercion problems are not errors at this level; they are
/// recorded on the affected row and staging continues.
#[derive(Debug, Error)]
pub enum StageError {
    /// The dataset never parsed; there is nothing to stage.
    #[error("dataset failed to parse: {reason}")]
    DatasetUnparsed { reason: String },
    /// Cancelled between row batches. Nothing was committed.
    #[error("staging cancelled")]
    Cancelled,
    #[error("hash staging input: {0}")]
    Hash(#[from] serde_json::Error),
}
