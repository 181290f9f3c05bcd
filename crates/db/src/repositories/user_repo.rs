//! Repository for the `users` table.
//!
//! Write operations accept any SQLite executor so the batch writer can run
//! them inside its per-chunk transaction.

use sqlx::SqliteExecutor;

use roster_core::record::UserRecord;
use roster_core::types::{ExternalId, Timestamp};

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, external_id, email, first_name, last_name, cart_number, \
    created_at, updated_at, deleted_at";

/// An empty file cell is stored as NULL so the UNIQUE constraints on email
/// and cart_number never collide rows that simply lack a value.
fn nullable(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by external identifier, including soft-deleted rows.
    ///
    /// This is the lookup the insert/update/restore classification runs on:
    /// a soft-deleted match must be restored, never shadowed by an insert.
    pub async fn find_by_external_id_any<'e, E: SqliteExecutor<'e>>(
        executor: E,
        external_id: ExternalId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE external_id = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(external_id)
            .fetch_optional(executor)
            .await
    }

    /// Find an active (not soft-deleted) user by external identifier.
    pub async fn find_by_external_id<'e, E: SqliteExecutor<'e>>(
        executor: E,
        external_id: ExternalId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM users WHERE external_id = ? AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(external_id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a new user from a file record.
    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        executor: E,
        record: &UserRecord,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO users
                (external_id, email, first_name, last_name, cart_number,
                 created_at, updated_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(record.external_id)
        .bind(nullable(&record.email))
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(nullable(&record.cart_number))
        .bind(now)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Overwrite all file-sourced fields of an existing user, refresh
    /// `updated_at`, and clear any soft deletion.
    ///
    /// Serves both the update and the restore path; the caller classifies
    /// the two from the prior row state.
    pub async fn apply_record<'e, E: SqliteExecutor<'e>>(
        executor: E,
        record: &UserRecord,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                email = ?,
                first_name = ?,
                last_name = ?,
                cart_number = ?,
                updated_at = ?,
                deleted_at = NULL
             WHERE external_id = ?",
        )
        .bind(nullable(&record.email))
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(nullable(&record.cart_number))
        .bind(now)
        .bind(record.external_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Soft-delete every active user whose `updated_at` is strictly earlier
    /// than the staleness watermark. Returns the number of rows affected.
    ///
    /// Single bulk statement by design: no per-identifier diffing, no list
    /// of file identifiers needed.
    pub async fn soft_delete_stale<'e, E: SqliteExecutor<'e>>(
        executor: E,
        watermark: Timestamp,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = ?
             WHERE updated_at < ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(watermark)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// List active users ordered by external identifier.
    pub async fn list_active<'e, E: SqliteExecutor<'e>>(
        executor: E,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY external_id"
        );
        sqlx::query_as::<_, User>(&query).fetch_all(executor).await
    }

    /// Count all rows, soft-deleted included.
    pub async fn count_all<'e, E: SqliteExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await
    }
}
