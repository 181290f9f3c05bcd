//! Engine error taxonomy.
//!
//! Duplicate and malformed rows are deliberately absent here: they are
//! non-fatal rejections, counted and logged, never errors. Validation-stage
//! problems collect into lists so the operator sees everything in one run;
//! write-stage errors are fail-fast per batch.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The input file could not be copied to the private working location.
    #[error("Cannot stage input file '{path}': {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another run holds the single-active-run slot for this store.
    #[error("Another reconciliation run is already active against this store")]
    RunActive,

    /// One or more mandatory columns could not be mapped from the header.
    #[error("Header validation failed: {}", errors.join("; "))]
    HeaderValidation { errors: Vec<String> },

    /// The input file could not be parsed.
    #[error("Failed to read input file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The per-batch log sink rejected the buffered entries. Never
    /// swallowed: the batch itself is already committed, so this surfaces
    /// as a mid-run failure.
    #[error("Failed to persist run log entries: {0}")]
    LogPersistence(#[source] sqlx::Error),
}

impl SyncError {
    /// Flatten into the human-readable message list reported for a
    /// failure before any store mutation.
    pub fn into_messages(self) -> Vec<String> {
        match self {
            Self::HeaderValidation { errors } => errors,
            other => vec![other.to_string()],
        }
    }
}
