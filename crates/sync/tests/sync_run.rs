//! End-to-end runs of the reconciliation engine against a migrated store:
//! fresh loads, updates, restores, stale pruning, validation rejections,
//! the failure contract, and the single-run guard.

use std::io::Write;
use std::path::PathBuf;

use assert_matches::assert_matches;
use chrono::Utc;
use sqlx::SqlitePool;
use tempfile::NamedTempFile;

use roster_core::config::SyncConfig;
use roster_core::record::UserRecord;
use roster_core::run::RunPhase;
use roster_core::summary::RunSummary;
use roster_db::repositories::{SyncLogRepo, SyncRunRepo, UserRepo};
use roster_sync::batch::BatchWriter;
use roster_sync::{RunOutcome, SyncError, SyncRunner};

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}

fn runner(pool: &SqlitePool) -> SyncRunner {
    SyncRunner::new(pool.clone(), SyncConfig::default())
}

async fn run_to_completion(pool: &SqlitePool, lines: &[&str]) -> RunSummary {
    let file = csv_file(lines);
    match runner(pool).run(file.path()).await.unwrap() {
        RunOutcome::Completed(summary) => summary,
        other => panic!("run should complete, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Fresh load
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_fresh_file_inserts_every_row(pool: SqlitePool) {
    let summary = run_to_completion(
        &pool,
        &[
            "id,email,name,surname,card",
            "1,a@x.com,Ann,Lee,111",
            "2,b@x.com,Bob,Kim,222",
        ],
    )
    .await;

    assert_eq!(summary.new, 2);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.restored, 0);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.deleted, 0);
    assert!(summary.finished_at.is_some());

    let users = UserRepo::list_active(&pool).await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].external_id, 1);
    assert_eq!(users[0].email.as_deref(), Some("a@x.com"));
    assert_eq!(users[1].cart_number.as_deref(), Some("222"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_completed_run_row_carries_final_counters(pool: SqlitePool) {
    run_to_completion(
        &pool,
        &["id,email,card", "1,a@x.com,111", "2,b@x.com,222"],
    )
    .await;

    let run = SyncRunRepo::find_by_id(&pool, 1).await.unwrap().unwrap();
    assert_eq!(run.phase(), Some(RunPhase::Completed));
    assert_eq!(run.users_new, 2);
    assert_eq!(run.rows_rejected, 0);
    assert!(run.finished_at.is_some());
    assert!(run.error.is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_columns_map_in_any_order_and_case(pool: SqlitePool) {
    let summary = run_to_completion(
        &pool,
        &["Card Number,User Email,ID", "777,g@x.com,7"],
    )
    .await;

    assert_eq!(summary.new, 1);
    let user = UserRepo::find_by_external_id(&pool, 7)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.cart_number.as_deref(), Some("777"));
    assert_eq!(user.email.as_deref(), Some("g@x.com"));
    assert_eq!(user.first_name, "");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_file_with_only_mandatory_columns_completes(pool: SqlitePool) {
    // No email column: the cells it would fill stay NULL, and NULLs never
    // collide on the unique constraint.
    let summary = run_to_completion(&pool, &["id,card", "1,111", "2,222", "3,", "4,"]).await;

    assert_eq!(summary.new, 4);
    assert_eq!(summary.rejected, 0);

    let users = UserRepo::list_active(&pool).await.unwrap();
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|u| u.email.is_none()));
    assert_eq!(users[0].cart_number.as_deref(), Some("111"));
    // Empty cart cells also land as NULL without colliding.
    assert!(users[2].cart_number.is_none());
    assert!(users[3].cart_number.is_none());
}

// ---------------------------------------------------------------------------
// Validation rejections
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_duplicate_identifier_excludes_every_occurrence(pool: SqlitePool) {
    let summary = run_to_completion(
        &pool,
        &[
            "id,card",
            "5,first",
            "1,111",
            "5,second",
        ],
    )
    .await;

    // One rejection per extra occurrence; no version of the row survives.
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.new, 1);
    assert!(UserRepo::find_by_external_id_any(&pool, 5)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_malformed_identifier_is_rejected_not_fatal(pool: SqlitePool) {
    let summary = run_to_completion(
        &pool,
        &["id,card", "abc,111", "2,222", ",333"],
    )
    .await;

    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.new, 1);

    let kinds = SyncLogRepo::count_by_kind(&pool, 1).await.unwrap();
    let rejections = kinds
        .iter()
        .find(|(kind, _)| kind == "validation_failed")
        .map(|(_, count)| *count);
    assert_eq!(rejections, Some(2));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_missing_mandatory_column_fails_before_mutation(pool: SqlitePool) {
    let file = csv_file(&["email,name", "a@x.com,Ann"]);
    let outcome = runner(&pool).run(file.path()).await.unwrap();

    let errors = assert_matches!(
        outcome,
        RunOutcome::FailedBeforeMutation { errors } => errors
    );
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| e.contains("external_id")));
    assert!(errors.iter().any(|e| e.contains("cart_number")));

    assert_eq!(UserRepo::count_all(&pool).await.unwrap(), 0);
    let run = SyncRunRepo::find_by_id(&pool, 1).await.unwrap().unwrap();
    assert_eq!(run.phase(), Some(RunPhase::Failed));
    assert!(run.error.is_some());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_missing_source_file_fails_without_a_run_row(pool: SqlitePool) {
    let outcome = runner(&pool)
        .run(PathBuf::from("/nonexistent/delivery.csv").as_path())
        .await
        .unwrap();

    assert_matches!(outcome, RunOutcome::FailedBeforeMutation { .. });
    assert!(SyncRunRepo::find_by_id(&pool, 1).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Update, restore, prune
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_second_run_updates_present_and_prunes_absent(pool: SqlitePool) {
    run_to_completion(
        &pool,
        &["id,email,card", "1,a@x.com,111", "2,b@x.com,222"],
    )
    .await;

    let summary = run_to_completion(&pool, &["id,email,card", "1,new@x.com,111"]).await;
    assert_eq!(summary.new, 0);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.deleted, 1);

    let kept = UserRepo::find_by_external_id(&pool, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.email.as_deref(), Some("new@x.com"));

    // Absent from the file: soft-deleted, not gone.
    assert!(UserRepo::find_by_external_id(&pool, 2)
        .await
        .unwrap()
        .is_none());
    let pruned = UserRepo::find_by_external_id_any(&pool, 2)
        .await
        .unwrap()
        .unwrap();
    assert!(pruned.is_deleted());
    assert_eq!(pruned.email.as_deref(), Some("b@x.com"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_reappearing_identifier_restores_the_row(pool: SqlitePool) {
    let full = ["id,email,card", "1,a@x.com,111", "2,b@x.com,222"];
    run_to_completion(&pool, &full).await;
    run_to_completion(&pool, &["id,email,card", "1,a@x.com,111"]).await;

    let summary =
        run_to_completion(&pool, &["id,email,card", "1,a@x.com,111", "2,b@x.com,999"]).await;
    assert_eq!(summary.restored, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.new, 0);

    let restored = UserRepo::find_by_external_id(&pool, 2)
        .await
        .unwrap()
        .unwrap();
    assert!(!restored.is_deleted());
    assert_eq!(restored.cart_number.as_deref(), Some("999"));

    // Still one physical row for the identifier.
    assert_eq!(UserRepo::count_all(&pool).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_rerunning_the_same_file_is_idempotent(pool: SqlitePool) {
    let lines = ["id,email,card", "1,a@x.com,111", "2,b@x.com,222"];
    run_to_completion(&pool, &lines).await;
    let summary = run_to_completion(&pool, &lines).await;

    assert_eq!(summary.new, 0);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.deleted, 0);
    assert_eq!(UserRepo::count_all(&pool).await.unwrap(), 2);
    assert_eq!(UserRepo::list_active(&pool).await.unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Mid-sync failure contract
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_mid_sync_failure_keeps_committed_chunks(pool: SqlitePool) {
    // Two distinct identifiers sharing a cart number: with chunk size 1 the
    // first chunk commits, the second hits the unique constraint.
    let file = csv_file(&["id,card", "1,111", "2,111"]);
    let runner = SyncRunner::new(pool.clone(), SyncConfig::default().with_chunk_size(1));
    let outcome = runner.run(file.path()).await.unwrap();

    let (summary, error) = assert_matches!(
        outcome,
        RunOutcome::FailedDuringMutation { summary, error } => (summary, error)
    );
    assert_eq!(summary.new, 1);
    assert_matches!(error, SyncError::Database(_));

    // The committed chunk stays applied; nothing from the failed one does.
    assert!(UserRepo::find_by_external_id(&pool, 1)
        .await
        .unwrap()
        .is_some());
    assert!(UserRepo::find_by_external_id_any(&pool, 2)
        .await
        .unwrap()
        .is_none());

    // Run row closed as failed with the partial counters, slot released.
    let run = SyncRunRepo::find_by_id(&pool, 1).await.unwrap().unwrap();
    assert_eq!(run.phase(), Some(RunPhase::Failed));
    assert_eq!(run.users_new, 1);
    assert!(run.error.is_some());
    assert!(SyncRunRepo::begin(&pool, Utc::now()).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_rejection_entries_survive_a_sync_stage_failure(pool: SqlitePool) {
    // The cart collision rolls back the only chunk, but the rejection
    // logged during the identifier pass must already be in the sink.
    let file = csv_file(&["id,card", "abc,999", "1,111", "2,111"]);
    let outcome = runner(&pool).run(file.path()).await.unwrap();
    assert_matches!(outcome, RunOutcome::FailedDuringMutation { .. });

    let entries = SyncLogRepo::list_by_run(&pool, 1).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, "validation_failed");
    assert!(entries[0].message.contains("abc"));
}

// ---------------------------------------------------------------------------
// Single-run guard
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_active_run_refuses_a_second_runner(pool: SqlitePool) {
    let active = SyncRunRepo::begin(&pool, Utc::now()).await.unwrap();
    assert!(active.is_some());

    let file = csv_file(&["id,card", "1,111"]);
    let outcome = runner(&pool).run(file.path()).await.unwrap();

    let errors = assert_matches!(
        outcome,
        RunOutcome::FailedBeforeMutation { errors } => errors
    );
    assert!(errors[0].contains("already active"));
    assert_eq!(UserRepo::count_all(&pool).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Persisted run log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_run_log_records_every_event(pool: SqlitePool) {
    run_to_completion(
        &pool,
        &["id,email,card", "1,old@x.com,111", "2,b@x.com,222"],
    )
    .await;
    run_to_completion(&pool, &["id,email,card", "1,a@x.com,111"]).await;

    let entries = SyncLogRepo::list_by_run(&pool, 2).await.unwrap();
    let kinds: Vec<&str> = entries.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, vec!["updated", "removed"]);

    let updated = &entries[0];
    assert!(updated.message.contains('1'));
    assert_eq!(updated.context.0["previous"]["email"], "old@x.com");
    assert_eq!(updated.context.0["new"]["email"], "a@x.com");

    let removed = &entries[1];
    assert_eq!(removed.context.0["deleted"], 1);
}

// ---------------------------------------------------------------------------
// Batch writer chunking
// ---------------------------------------------------------------------------

fn record(external_id: i64) -> UserRecord {
    UserRecord {
        external_id,
        email: format!("u{external_id}@x.com"),
        first_name: String::new(),
        last_name: String::new(),
        cart_number: format!("c{external_id}"),
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_one_record_past_the_chunk_size_means_two_flushes(pool: SqlitePool) {
    let run = SyncRunRepo::begin(&pool, Utc::now()).await.unwrap().unwrap();
    let mut summary = RunSummary::new(Utc::now());
    let mut writer = BatchWriter::new(run.id, 2);

    for id in 1..=3 {
        writer.push(&pool, record(id), &mut summary).await.unwrap();
    }
    writer.finish(&pool, &mut summary).await.unwrap();

    assert_eq!(writer.flushes(), 2);
    assert_eq!(summary.new, 3);
    assert_eq!(UserRepo::count_all(&pool).await.unwrap(), 3);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_finish_flushes_a_partial_chunk(pool: SqlitePool) {
    let run = SyncRunRepo::begin(&pool, Utc::now()).await.unwrap().unwrap();
    let mut summary = RunSummary::new(Utc::now());
    let mut writer = BatchWriter::new(run.id, 100);

    writer.push(&pool, record(1), &mut summary).await.unwrap();
    assert_eq!(writer.flushes(), 0);

    writer.finish(&pool, &mut summary).await.unwrap();
    assert_eq!(writer.flushes(), 1);
    assert_eq!(summary.new, 1);
}
