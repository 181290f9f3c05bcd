//! Pure domain logic for the roster reconciliation job.
//!
//! This crate has no database, async, or I/O dependencies. It provides the
//! header synonym mapping, the identifier ledger used for duplicate
//! detection, the canonical record payload, run log entry types, run phase
//! and summary types, and the engine configuration.

pub mod config;
pub mod fields;
pub mod identifiers;
pub mod log;
pub mod record;
pub mod run;
pub mod summary;
pub mod types;
