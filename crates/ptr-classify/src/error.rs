use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The stream is not readable as delimited text at all.
    #[error("read classification file: {0}")]
    Csv(#[from] csv::Error),
    /// Cancelled between row batches. No batch was created.
    #[error("classification import cancelled")]
    Cancelled,
}
