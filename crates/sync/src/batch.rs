//! Chunked transactional batch writer.
//!
//! Records accumulate in memory and flush as one transaction per chunk.
//! Each flushed record is classified against the existing row, soft-deleted
//! rows included: no row is an insert, a soft-deleted row is a restore,
//! an active row is an update. Log entries for a flush join the buffer only
//! after the transaction commits, so a rolled-back chunk leaves no log
//! trace, and the buffer is pushed to the persisted sink after every flush.

use chrono::Utc;

use roster_core::log::LogEntry;
use roster_core::record::UserRecord;
use roster_core::summary::RunSummary;
use roster_core::types::DbId;
use roster_db::repositories::{SyncLogRepo, UserRepo};
use roster_db::DbPool;

use crate::error::SyncError;

/// Buffers records and writes them to the store in chunked transactions.
pub struct BatchWriter {
    run_id: DbId,
    chunk_size: usize,
    pending: Vec<UserRecord>,
    log_buffer: Vec<LogEntry>,
    flushes: u64,
}

impl BatchWriter {
    pub fn new(run_id: DbId, chunk_size: usize) -> Self {
        Self {
            run_id,
            chunk_size: chunk_size.max(1),
            pending: Vec::new(),
            log_buffer: Vec::new(),
            flushes: 0,
        }
    }

    /// Queue a log entry for the next persistence push.
    ///
    /// Used for events that do not belong to a pending chunk, such as
    /// validation rejections and the prune summary.
    pub fn buffer_log(&mut self, entry: LogEntry) {
        self.log_buffer.push(entry);
    }

    /// Queue a record, flushing when the pending batch reaches the chunk
    /// size.
    pub async fn push(
        &mut self,
        pool: &DbPool,
        record: UserRecord,
        summary: &mut RunSummary,
    ) -> Result<(), SyncError> {
        self.pending.push(record);
        if self.pending.len() >= self.chunk_size {
            self.flush(pool, summary).await?;
        }
        Ok(())
    }

    /// Write every pending record in one transaction, then persist the
    /// accumulated log entries.
    pub async fn flush(
        &mut self,
        pool: &DbPool,
        summary: &mut RunSummary,
    ) -> Result<(), SyncError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut entries = Vec::with_capacity(self.pending.len());
        let mut new = 0u64;
        let mut updated = 0u64;
        let mut restored = 0u64;

        let mut tx = pool.begin().await?;
        for record in &self.pending {
            match UserRepo::find_by_external_id_any(&mut *tx, record.external_id).await? {
                None => {
                    UserRepo::insert(&mut *tx, record, now).await?;
                    new += 1;
                    entries.push(LogEntry::added(record));
                }
                Some(user) if user.is_deleted() => {
                    let previous = user.snapshot();
                    UserRepo::apply_record(&mut *tx, record, now).await?;
                    restored += 1;
                    entries.push(LogEntry::restored(record, previous));
                }
                Some(user) => {
                    let previous = user.snapshot();
                    UserRepo::apply_record(&mut *tx, record, now).await?;
                    updated += 1;
                    entries.push(LogEntry::updated(record, previous));
                }
            }
        }
        tx.commit().await?;

        summary.new += new;
        summary.updated += updated;
        summary.restored += restored;
        self.log_buffer.append(&mut entries);
        self.pending.clear();
        self.flushes += 1;

        tracing::debug!(
            run_id = self.run_id,
            flush = self.flushes,
            new,
            updated,
            restored,
            "batch committed"
        );

        self.persist_logs(pool).await
    }

    /// Persist and clear the buffered log entries.
    pub async fn persist_logs(&mut self, pool: &DbPool) -> Result<(), SyncError> {
        if self.log_buffer.is_empty() {
            return Ok(());
        }
        SyncLogRepo::insert_batch(pool, self.run_id, &self.log_buffer, Utc::now())
            .await
            .map_err(SyncError::LogPersistence)?;
        self.log_buffer.clear();
        Ok(())
    }

    /// Flush the final partial chunk and drain the log buffer.
    pub async fn finish(
        &mut self,
        pool: &DbPool,
        summary: &mut RunSummary,
    ) -> Result<(), SyncError> {
        self.flush(pool, summary).await?;
        self.persist_logs(pool).await
    }

    /// Number of committed chunk transactions so far.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}
