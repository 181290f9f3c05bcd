//! Repository for the `sync_runs` table.
//!
//! Run creation doubles as the single-active-run guard: the insert is
//! conditional on no other run being in a non-terminal status, so two
//! concurrent runs against the same store cannot both acquire a row.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use roster_core::run::RunPhase;
use roster_core::summary::RunSummary;
use roster_core::types::{DbId, Timestamp};

use crate::models::sync_run::SyncRun;
use crate::DbPool;

/// Column list for sync_runs queries.
const COLUMNS: &str = "id, status, started_at, finished_at, users_new, users_updated, \
    users_restored, rows_rejected, users_deleted, error";

/// Provides CRUD operations for sync runs.
pub struct SyncRunRepo;

impl SyncRunRepo {
    /// Create a run row in the `initialized` phase, provided no other run
    /// is active.
    ///
    /// Returns `None` when another run holds the slot; the caller must fail
    /// fast rather than proceed.
    pub async fn begin(pool: &DbPool, started_at: Timestamp) -> Result<Option<SyncRun>, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO sync_runs (status, started_at)
             SELECT ?, ?
             WHERE NOT EXISTS (
                 SELECT 1 FROM sync_runs WHERE status NOT IN ('completed', 'failed')
             )",
        )
        .bind(RunPhase::Initialized.as_str())
        .bind(started_at)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(pool, result.last_insert_rowid()).await
    }

    /// Find a run by ID.
    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<SyncRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sync_runs WHERE id = ?");
        sqlx::query_as::<_, SyncRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The currently active run, if any.
    pub async fn find_active(pool: &DbPool) -> Result<Option<SyncRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sync_runs
             WHERE status NOT IN ('completed', 'failed')
             ORDER BY id DESC LIMIT 1"
        );
        sqlx::query_as::<_, SyncRun>(&query).fetch_optional(pool).await
    }

    /// Advance the persisted phase of a run.
    pub async fn update_phase(
        pool: &DbPool,
        id: DbId,
        phase: RunPhase,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sync_runs SET status = ? WHERE id = ?")
            .bind(phase.as_str())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Close a run as completed, persisting its final counters. Releases
    /// the single-run slot.
    pub async fn complete(
        pool: &DbPool,
        id: DbId,
        summary: &RunSummary,
    ) -> Result<(), sqlx::Error> {
        Self::close(pool, id, RunPhase::Completed, summary, None).await
    }

    /// Close a run as failed with the triggering error and whatever
    /// counters had accumulated. Releases the single-run slot.
    pub async fn fail(
        pool: &DbPool,
        id: DbId,
        summary: &RunSummary,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        Self::close(pool, id, RunPhase::Failed, summary, Some(error)).await
    }

    async fn close(
        pool: &DbPool,
        id: DbId,
        phase: RunPhase,
        summary: &RunSummary,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE sync_runs SET
                status = ?,
                finished_at = ?,
                users_new = ?,
                users_updated = ?,
                users_restored = ?,
                rows_rejected = ?,
                users_deleted = ?,
                error = ?
             WHERE id = ?",
        )
        .bind(phase.as_str())
        .bind(summary.finished_at)
        .bind(summary.new as i64)
        .bind(summary.updated as i64)
        .bind(summary.restored as i64)
        .bind(summary.rejected as i64)
        .bind(summary.deleted as i64)
        .bind(error)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Count runs grouped by status.
    ///
    /// Returns tuples of (status, count).
    pub async fn count_by_status(pool: &DbPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT status, COUNT(*) as count FROM sync_runs
             GROUP BY status
             ORDER BY status",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>("status"), r.get::<i64, _>("count")))
            .collect())
    }
}
