use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid tenant id: {0:?}")]
    InvalidTenantId(String),
    #[error("invalid profile id: {0:?}")]
    InvalidProfileId(String),
    #[error("row numbers start at 1")]
    ZeroRowNumber,
    #[error("unknown canonical field: {0:?}")]
    UnknownCanonicalField(String),
    #[error("unknown finding code: {0:?}")]
    UnknownFindingCode(String),
}
