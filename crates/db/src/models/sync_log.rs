//! Persisted run log entry model.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use roster_core::log::LogKind;
use roster_core::types::{DbId, Timestamp};

/// A row from the `sync_log` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SyncLogRow {
    pub id: DbId,
    pub run_id: DbId,
    pub kind: String,
    pub message: String,
    pub context: Json<serde_json::Value>,
    pub created_at: Timestamp,
}

impl SyncLogRow {
    /// The parsed log kind, if the stored string is recognized.
    pub fn log_kind(&self) -> Option<LogKind> {
        LogKind::from_str(&self.kind)
    }
}
