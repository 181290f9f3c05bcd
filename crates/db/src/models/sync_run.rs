//! Sync run bookkeeping model.

use serde::Serialize;
use sqlx::FromRow;

use roster_core::run::RunPhase;
use roster_core::types::{DbId, Timestamp};

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SyncRun {
    pub id: DbId,
    pub status: String,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    pub users_new: i64,
    pub users_updated: i64,
    pub users_restored: i64,
    pub rows_rejected: i64,
    pub users_deleted: i64,
    pub error: Option<String>,
}

impl SyncRun {
    /// The parsed run phase, if the stored status string is recognized.
    pub fn phase(&self) -> Option<RunPhase> {
        RunPhase::from_str(&self.status)
    }
}
