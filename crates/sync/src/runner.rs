//! Run orchestration.
//!
//! Staging, validation, sync, and prune happen in a fixed order, with the
//! persisted run row advanced through its phases at each boundary. The
//! failure contract hinges on where the error struck: anything before the
//! first chunk commit fails the run with the store untouched; anything
//! after reports the counters accumulated so far alongside the error.

use std::path::Path;

use chrono::Utc;

use roster_core::config::SyncConfig;
use roster_core::fields::{map_header, CanonicalField, HeaderScan};
use roster_core::identifiers::{parse_external_id, IdentifierLedger, Observation};
use roster_core::log::LogEntry;
use roster_core::record::UserRecord;
use roster_core::run::RunPhase;
use roster_core::summary::RunSummary;
use roster_core::types::DbId;
use roster_db::repositories::{SyncRunRepo, UserRepo};
use roster_db::DbPool;

use crate::batch::BatchWriter;
use crate::error::SyncError;
use crate::staging::StagedFile;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Terminal state of one reconciliation run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run completed; every counter in the summary is final.
    Completed(RunSummary),
    /// The run failed before touching any user row. The store is exactly
    /// as it was; only the run row records the failure.
    FailedBeforeMutation { errors: Vec<String> },
    /// The run failed after one or more chunks had committed. The summary
    /// counts what was applied before the error.
    FailedDuringMutation {
        summary: RunSummary,
        error: SyncError,
    },
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Drives one reconciliation run from input file to terminal run state.
pub struct SyncRunner {
    pool: DbPool,
    config: SyncConfig,
}

impl SyncRunner {
    pub fn new(pool: DbPool, config: SyncConfig) -> Self {
        Self { pool, config }
    }

    /// Execute a full run against `source`.
    ///
    /// Infallible at the signature: every failure mode is a variant of
    /// [`RunOutcome`], with the run row closed accordingly before return.
    pub async fn run(&self, source: &Path) -> Result<RunOutcome, SyncError> {
        let started_at = Utc::now();
        let mut summary = RunSummary::new(started_at);

        let staged = match StagedFile::stage(source) {
            Ok(staged) => staged,
            Err(err) => {
                return Ok(RunOutcome::FailedBeforeMutation {
                    errors: err.into_messages(),
                })
            }
        };

        let run = match SyncRunRepo::begin(&self.pool, started_at).await? {
            Some(run) => run,
            None => {
                tracing::warn!("run refused: another run is active");
                return Ok(RunOutcome::FailedBeforeMutation {
                    errors: SyncError::RunActive.into_messages(),
                });
            }
        };
        tracing::info!(run_id = run.id, source = %source.display(), "run started");

        let mut writer = BatchWriter::new(run.id, self.config.chunk_size);

        let (scan, ledger) = match self
            .prepare(run.id, &staged, &mut writer, &mut summary)
            .await
        {
            Ok(prepared) => prepared,
            Err(err) => {
                let errors = err.into_messages();
                summary.finish(Utc::now());
                SyncRunRepo::fail(&self.pool, run.id, &summary, &errors.join("; ")).await?;
                tracing::error!(run_id = run.id, ?errors, "run failed during validation");
                return Ok(RunOutcome::FailedBeforeMutation { errors });
            }
        };

        if let Err(error) = self
            .mutate(run.id, &staged, &scan, &ledger, &mut writer, &mut summary)
            .await
        {
            summary.finish(Utc::now());
            SyncRunRepo::fail(&self.pool, run.id, &summary, &error.to_string()).await?;
            tracing::error!(run_id = run.id, %error, "run failed mid-sync");
            return Ok(RunOutcome::FailedDuringMutation { summary, error });
        }

        summary.finish(Utc::now());
        SyncRunRepo::complete(&self.pool, run.id, &summary).await?;
        tracing::info!(
            run_id = run.id,
            new = summary.new,
            updated = summary.updated,
            restored = summary.restored,
            rejected = summary.rejected,
            deleted = summary.deleted,
            elapsed_ms = summary.elapsed().num_milliseconds(),
            "run completed"
        );
        Ok(RunOutcome::Completed(summary))
    }

    /// Validation stages: header mapping, then the identifier pass.
    ///
    /// Nothing here mutates a user row. Duplicate and malformed identifiers
    /// are counted and logged, not raised; only an unmappable mandatory
    /// column or an unreadable file is an error.
    async fn prepare(
        &self,
        run_id: DbId,
        staged: &StagedFile,
        writer: &mut BatchWriter,
        summary: &mut RunSummary,
    ) -> Result<(HeaderScan, IdentifierLedger), SyncError> {
        let mut reader = staged.reader()?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let scan = map_header(&headers, &self.config.field_specs);

        for warning in &scan.warnings {
            tracing::warn!(run_id, "{warning}");
        }
        if !scan.is_valid() {
            return Err(SyncError::HeaderValidation {
                errors: scan.errors,
            });
        }
        SyncRunRepo::update_phase(&self.pool, run_id, RunPhase::HeaderValidated).await?;

        let id_column = scan.mapping.column(CanonicalField::ExternalId);
        let mut ledger = IdentifierLedger::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let raw = id_column.and_then(|index| record.get(index)).unwrap_or("");

            match parse_external_id(Some(raw)) {
                Some(id) => {
                    if ledger.observe(id) == Observation::Duplicate {
                        summary.rejected += 1;
                        writer.buffer_log(LogEntry::duplicate_identifier(line, id));
                    }
                }
                None => {
                    summary.rejected += 1;
                    writer.buffer_log(LogEntry::malformed_identifier(line, raw));
                }
            }
        }
        SyncRunRepo::update_phase(&self.pool, run_id, RunPhase::IdentifiersCollected).await?;
        tracing::debug!(
            run_id,
            identifiers = ledger.len(),
            rejected = summary.rejected,
            "identifier pass done"
        );

        // Rejection entries go to the sink now, not with the first batch:
        // a later sync-stage failure must not lose them.
        writer.persist_logs(&self.pool).await?;

        Ok((scan, ledger))
    }

    /// Mutation stages: the chunked sync pass, then the stale prune.
    async fn mutate(
        &self,
        run_id: DbId,
        staged: &StagedFile,
        scan: &HeaderScan,
        ledger: &IdentifierLedger,
        writer: &mut BatchWriter,
        summary: &mut RunSummary,
    ) -> Result<(), SyncError> {
        SyncRunRepo::update_phase(&self.pool, run_id, RunPhase::Syncing).await?;

        let id_column = scan.mapping.column(CanonicalField::ExternalId);

        // Second pass over the staged copy; a fresh reader is the rewind.
        let mut reader = staged.reader()?;
        for result in reader.records() {
            let record = result?;
            let raw = id_column.and_then(|index| record.get(index)).unwrap_or("");
            let Some(id) = parse_external_id(Some(raw)) else {
                continue;
            };
            if !ledger.is_validated(id) {
                continue;
            }

            let cells: Vec<&str> = record.iter().collect();
            let user = UserRecord::from_row(id, &cells, &scan.mapping);
            writer.push(&self.pool, user, summary).await?;
        }
        writer.finish(&self.pool, summary).await?;

        // Every row the run touched carries updated_at >= started_at;
        // everything older was absent from the file and goes stale.
        let deleted =
            UserRepo::soft_delete_stale(&self.pool, summary.started_at, Utc::now()).await?;
        summary.deleted = deleted;
        writer.buffer_log(LogEntry::removed(deleted));
        writer.persist_logs(&self.pool).await?;

        SyncRunRepo::update_phase(&self.pool, run_id, RunPhase::Pruned).await?;
        Ok(())
    }
}
