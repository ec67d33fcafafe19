//! Configuration errors raised during mapping resolution.

use thiserror::Error;

use ptr_model::CanonicalField;

/// A malformed column-map configuration. Rejected wholesale; resolution
/// never produces a partial mapping from bad configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("source header {header:?} is mapped more than once")]
    DuplicateSource { header: String },
    #[error("canonical field {field} has more than one direct mapping")]
    DuplicateField { field: CanonicalField },
    #[error("passthrough alias {alias:?} is used more than once")]
    DuplicateAlias { alias: String },
}
