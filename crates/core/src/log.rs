//! Run log entry types.
//!
//! Every notable per-record event in a run produces one entry: rejected
//! rows during validation, and added / updated / restored / removed records
//! during the write stages. Entries are buffered in memory and persisted per
//! batch by the engine.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::record::UserRecord;
use crate::types::ExternalId;

// ---------------------------------------------------------------------------
// Log kind
// ---------------------------------------------------------------------------

/// Kind of a run log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    ValidationFailed,
    Added,
    Updated,
    Removed,
    Restored,
}

impl LogKind {
    /// Return the kind name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "validation_failed",
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Removed => "removed",
            Self::Restored => "restored",
        }
    }

    /// Parse a kind string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "validation_failed" => Some(Self::ValidationFailed),
            "added" => Some(Self::Added),
            "updated" => Some(Self::Updated),
            "removed" => Some(Self::Removed),
            "restored" => Some(Self::Restored),
            _ => None,
        }
    }

    /// All valid kind values.
    pub const ALL: &'static [&'static str] =
        &["validation_failed", "added", "updated", "removed", "restored"];
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// One run log entry: `{kind, message, context}`.
///
/// The shape is part of the contract other tooling reads; `context` carries
/// previous/new field snapshots where they exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
    pub context: serde_json::Value,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: json!({}),
        }
    }

    /// A rejection entry naming the originating line.
    pub fn validation_failed(line: u64, message: impl std::fmt::Display) -> Self {
        Self::new(
            LogKind::ValidationFailed,
            format!("Error on line {line}: {message}"),
        )
    }

    /// Entry for a freshly inserted record.
    pub fn added(record: &UserRecord) -> Self {
        Self {
            kind: LogKind::Added,
            message: format!("{} added", record.external_id),
            context: json!({ "new": record }),
        }
    }

    /// Entry for an updated record, with previous and new snapshots.
    pub fn updated(record: &UserRecord, previous: serde_json::Value) -> Self {
        Self {
            kind: LogKind::Updated,
            message: format!("{} updated", record.external_id),
            context: json!({ "previous": previous, "new": record }),
        }
    }

    /// Entry for a record restored from soft deletion.
    pub fn restored(record: &UserRecord, previous: serde_json::Value) -> Self {
        Self {
            kind: LogKind::Restored,
            message: format!("{} restored", record.external_id),
            context: json!({ "previous": previous, "new": record }),
        }
    }

    /// Summary entry for the end-of-run stale prune.
    pub fn removed(count: u64) -> Self {
        Self {
            kind: LogKind::Removed,
            message: format!("{count} stale users removed"),
            context: json!({ "deleted": count }),
        }
    }

    /// A duplicate-identifier rejection entry.
    pub fn duplicate_identifier(line: u64, id: ExternalId) -> Self {
        Self::validation_failed(line, format!("{id} already exists in file"))
    }

    /// A malformed-identifier rejection entry.
    pub fn malformed_identifier(line: u64, raw: &str) -> Self {
        Self::validation_failed(line, format!("invalid external id '{raw}'"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
