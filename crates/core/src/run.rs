//! Run phase state machine.
//!
//! A run moves strictly forward through its phases; any failure transitions
//! to `Failed`. The current phase is persisted on the run row, which is also
//! what the single-active-run guard inspects.

use serde::{Deserialize, Serialize};

/// Phase of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// File staged and run row created.
    Initialized,
    /// Header mapped, all mandatory columns resolved.
    HeaderValidated,
    /// First pass done, identifier ledger built.
    IdentifiersCollected,
    /// Second pass in progress, batches flushing.
    Syncing,
    /// Stale records soft-deleted.
    Pruned,
    Completed,
    Failed,
}

impl RunPhase {
    /// Return the phase name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::HeaderValidated => "header_validated",
            Self::IdentifiersCollected => "identifiers_collected",
            Self::Syncing => "syncing",
            Self::Pruned => "pruned",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a phase string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "initialized" => Some(Self::Initialized),
            "header_validated" => Some(Self::HeaderValidated),
            "identifiers_collected" => Some(Self::IdentifiersCollected),
            "syncing" => Some(Self::Syncing),
            "pruned" => Some(Self::Pruned),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// All valid phase values.
    pub const ALL: &'static [&'static str] = &[
        "initialized",
        "header_validated",
        "identifiers_collected",
        "syncing",
        "pruned",
        "completed",
        "failed",
    ];

    /// A run in this phase still holds the single-run slot.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
