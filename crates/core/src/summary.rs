//! Run summary counters.

use serde::Serialize;

use crate::types::Timestamp;

/// Passive accumulator for the outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Records inserted for the first time.
    pub new: u64,
    /// Matched active records rewritten.
    pub updated: u64,
    /// Matched soft-deleted records brought back.
    pub restored: u64,
    /// Rows excluded during validation (duplicates and malformed rows).
    pub rejected: u64,
    /// Stale records soft-deleted by the end-of-run prune.
    pub deleted: u64,
    /// Staleness watermark: records not touched after this are pruned.
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl RunSummary {
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            new: 0,
            updated: 0,
            restored: 0,
            rejected: 0,
            deleted: 0,
            started_at,
            finished_at: None,
        }
    }

    /// Mark the run finished at the given instant.
    pub fn finish(&mut self, at: Timestamp) {
        self.finished_at = Some(at);
    }

    /// Wall-clock duration of the run, up to `finished_at` (or zero while
    /// still running).
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at
            .map(|end| end - self.started_at)
            .unwrap_or_else(chrono::Duration::zero)
    }
}
