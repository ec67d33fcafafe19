//! Classification import and matching.
//!
//! The small-business classification itself is produced by an external
//! tool; this crate parses its delimited export into a batch of
//! (identifier, outcome) results and attaches verdicts to staged rows by
//! normalized identifier. Import is idempotent by file hash — the
//! orchestrator checks the hash before creating a new batch.

pub mod error;
pub mod import;
pub mod matcher;

pub use error::ClassifyError;
pub use import::{ImportOutcome, parse_results};
pub use matcher::{MatchSummary, match_rows};
