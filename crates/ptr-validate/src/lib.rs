//! Validation gate.
//!
//! Re-derives a pass/fail verdict from the current staged, ruled and
//! classified row set. Pure and side-effect free: the verdict is computed
//! on demand, never stored, and report generation must consult it and
//! refuse to proceed while blockers exist.

pub mod gate;

pub use gate::{MAX_ITEMIZED_FINDINGS, compute_verdict};
