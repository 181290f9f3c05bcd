use sqlx::SqlitePool;

/// Full bootstrap test: migrate, verify schema.
#[sqlx::test(migrations = "./migrations")]
async fn test_full_bootstrap(pool: SqlitePool) {
    roster_db::health_check(&pool).await.unwrap();

    // Verify all three tables exist.
    let tables = ["users", "sync_runs", "sync_log"];

    for table in tables {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 1, "{table} table should exist");
    }
}

/// The watermark index on users.updated_at must exist — the stale prune
/// depends on it.
#[sqlx::test(migrations = "./migrations")]
async fn test_updated_at_index_exists(pool: SqlitePool) {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type = 'index' AND name = 'idx_users_updated_at'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count.0, 1);
}
