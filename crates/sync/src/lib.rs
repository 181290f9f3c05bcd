//! The roster reconciliation engine.
//!
//! A run is a single-file batch job: stage a private copy of the delivered
//! CSV, map its header against the synonym table, make one pass to validate
//! identifiers (duplicate detection), a second pass to apply records in
//! chunked transactions, then soft-delete every persisted record the run
//! did not touch. See [`runner::SyncRunner`] for the orchestration and
//! [`runner::RunOutcome`] for the exit contract.

pub mod batch;
pub mod error;
pub mod runner;
pub mod staging;

pub use error::SyncError;
pub use runner::{RunOutcome, SyncRunner};
