//! Engine configuration.

use crate::fields::{default_field_specs, FieldSpec};

/// Default number of pending records per transactional flush.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Configuration for one reconciliation engine instance.
///
/// All fields have defaults suitable for production use; override via
/// environment variables or the builders below.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pending-batch threshold that triggers a transactional flush
    /// (default: 10 000).
    pub chunk_size: usize,
    /// Header synonym table and mandatory flags.
    pub field_specs: Vec<FieldSpec>,
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var      | Default |
    /// |--------------|---------|
    /// | `CHUNK_SIZE` | `10000` |
    pub fn from_env() -> Self {
        let chunk_size: usize = std::env::var("CHUNK_SIZE")
            .unwrap_or_else(|_| DEFAULT_CHUNK_SIZE.to_string())
            .parse()
            .expect("CHUNK_SIZE must be a valid usize");

        Self {
            chunk_size,
            field_specs: default_field_specs(),
        }
    }

    /// Override the chunk size, keeping it at least 1.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            field_specs: default_field_specs(),
        }
    }
}
