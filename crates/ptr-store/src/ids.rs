//! Explicit id generation.
//!
//! Constructed once at process start and passed by reference into every
//! component that mints an id. There is deliberately no global instance.

use std::sync::atomic::{AtomicU64, Ordering};

use ptr_model::{BatchId, DatasetId, RunId};

/// Monotonic id sequences, one per id kind.
#[derive(Debug, Default)]
pub struct IdService {
    runs: AtomicU64,
    datasets: AtomicU64,
    batches: AtomicU64,
}

impl IdService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_run_id(&self) -> RunId {
        RunId::from_raw(self.runs.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn next_dataset_id(&self) -> DatasetId {
        DatasetId::from_raw(self.datasets.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn next_batch_id(&self) -> BatchId {
        BatchId::from_raw(self.batches.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
