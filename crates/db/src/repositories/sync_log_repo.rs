//! Repository for the `sync_log` table — the run's persisted log sink.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use roster_core::log::LogEntry;
use roster_core::types::{DbId, Timestamp};

use crate::models::sync_log::SyncLogRow;
use crate::DbPool;

/// Column list for sync_log queries.
const COLUMNS: &str = "id, run_id, kind, message, context, created_at";

/// Provides persistence for run log entries.
pub struct SyncLogRepo;

impl SyncLogRepo {
    /// Persist a buffer of log entries for a run, in order, atomically.
    ///
    /// Called after each batch commit; entry order within the batch is
    /// preserved by insertion order.
    pub async fn insert_batch(
        pool: &DbPool,
        run_id: DbId,
        entries: &[LogEntry],
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = pool.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT INTO sync_log (run_id, kind, message, context, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(run_id)
            .bind(entry.kind.as_str())
            .bind(&entry.message)
            .bind(entry.context.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(run_id, count = entries.len(), "persisted log entries");
        Ok(())
    }

    /// List log entries for a run in persistence order.
    pub async fn list_by_run(pool: &DbPool, run_id: DbId) -> Result<Vec<SyncLogRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sync_log WHERE run_id = ? ORDER BY id ASC"
        );
        sqlx::query_as::<_, SyncLogRow>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }

    /// Count log entries grouped by kind for a run.
    ///
    /// Returns tuples of (kind, count).
    pub async fn count_by_kind(
        pool: &DbPool,
        run_id: DbId,
    ) -> Result<Vec<(String, i64)>, sqlx::Error> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT kind, COUNT(*) as count FROM sync_log
             WHERE run_id = ?
             GROUP BY kind
             ORDER BY kind",
        )
        .bind(run_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>("kind"), r.get::<i64, _>("count")))
            .collect())
    }
}
