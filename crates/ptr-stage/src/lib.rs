//! Staging engine: applies a resolved column map to raw rows.
//!
//! Produces exactly one staged row per source row, splitting each into the
//! canonical ("standard") bucket and the passthrough ("custom") bucket.
//! Staging is deterministic for identical inputs; the recorded input hash
//! lets callers detect idempotent re-runs. The engine itself commits
//! nothing — the orchestrator replaces a run's staged set wholesale under
//! the run lock.

pub mod engine;
pub mod error;
pub mod hash;

pub use engine::{StagingOutcome, stage_rows};
pub use error::StageError;
pub use hash::staging_input_hash;
