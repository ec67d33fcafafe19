//! Run lifecycle orchestration.
//!
//! `PipelineEngine` drives the pipeline over the store seam: each stage
//! runs to completion under its run's lock, commits wholesale, and records
//! the furthest committed step on the run. Different runs proceed
//! concurrently; within one run, steps are strictly serialized.

pub mod engine;
pub mod ingest;

pub use engine::{PipelineEngine, RuleSummary, StageSummary};
pub use ingest::{ParsedUpload, parse_csv};
