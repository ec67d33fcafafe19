use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Unknown id, or an id scoped to a different tenant.
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}
