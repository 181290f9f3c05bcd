//! Identifier ledger for the duplicate-detection pass.
//!
//! The first pass over the file records every external identifier it sees.
//! The first occurrence of an identifier validates it; any later occurrence
//! flips it to rejected for the whole run. The ledger is built once and only
//! consulted, never mutated, during the second pass.

use std::collections::HashMap;

use crate::types::ExternalId;

// ---------------------------------------------------------------------------
// Identifier status
// ---------------------------------------------------------------------------

/// Validation status of one external identifier within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierStatus {
    /// Seen exactly once so far.
    Validated,
    /// Seen more than once; every row carrying it is excluded from sync.
    Rejected,
}

/// Outcome of recording one identifier occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    FirstSeen,
    Duplicate,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Per-run map of external identifier to validation status.
#[derive(Debug, Default)]
pub struct IdentifierLedger {
    statuses: HashMap<ExternalId, IdentifierStatus>,
}

impl IdentifierLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of an identifier.
    ///
    /// The second and every later occurrence flips the stored status to
    /// [`IdentifierStatus::Rejected`] and reports a duplicate.
    pub fn observe(&mut self, id: ExternalId) -> Observation {
        match self.statuses.get_mut(&id) {
            Some(status) => {
                *status = IdentifierStatus::Rejected;
                Observation::Duplicate
            }
            None => {
                self.statuses.insert(id, IdentifierStatus::Validated);
                Observation::FirstSeen
            }
        }
    }

    /// Status of an identifier, if it was seen during the first pass.
    pub fn status(&self, id: ExternalId) -> Option<IdentifierStatus> {
        self.statuses.get(&id).copied()
    }

    /// Whether a row carrying this identifier should be synced.
    pub fn is_validated(&self, id: ExternalId) -> bool {
        self.status(id) == Some(IdentifierStatus::Validated)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// Parse the raw identifier cell of a row.
///
/// Returns `None` for a missing, empty, or non-integer value. Malformed
/// identifiers are never coerced to a fabricated number; the caller rejects
/// the row instead, so distinct malformed rows cannot collide.
pub fn parse_external_id(raw: Option<&str>) -> Option<ExternalId> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<ExternalId>().ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_is_validated() {
        let mut ledger = IdentifierLedger::new();
        assert_eq!(ledger.observe(7), Observation::FirstSeen);
        assert_eq!(ledger.status(7), Some(IdentifierStatus::Validated));
        assert!(ledger.is_validated(7));
    }

    #[test]
    fn second_occurrence_rejects_both() {
        let mut ledger = IdentifierLedger::new();
        ledger.observe(5);
        assert_eq!(ledger.observe(5), Observation::Duplicate);
        assert_eq!(ledger.status(5), Some(IdentifierStatus::Rejected));
        assert!(!ledger.is_validated(5));
    }

    #[test]
    fn third_occurrence_stays_rejected() {
        let mut ledger = IdentifierLedger::new();
        ledger.observe(5);
        ledger.observe(5);
        assert_eq!(ledger.observe(5), Observation::Duplicate);
        assert_eq!(ledger.status(5), Some(IdentifierStatus::Rejected));
    }

    #[test]
    fn unseen_identifier_has_no_status() {
        let ledger = IdentifierLedger::new();
        assert_eq!(ledger.status(42), None);
        assert!(!ledger.is_validated(42));
    }

    #[test]
    fn ledger_tracks_distinct_identifiers() {
        let mut ledger = IdentifierLedger::new();
        ledger.observe(1);
        ledger.observe(2);
        ledger.observe(2);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.is_validated(1));
        assert!(!ledger.is_validated(2));
    }

    // -- parse_external_id tests ----------------------------------------------

    #[test]
    fn parses_plain_integer() {
        assert_eq!(parse_external_id(Some("123")), Some(123));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(parse_external_id(Some("  42 ")), Some(42));
    }

    #[test]
    fn rejects_non_numeric() {
        assert_eq!(parse_external_id(Some("abc")), None);
        assert_eq!(parse_external_id(Some("12abc")), None);
        assert_eq!(parse_external_id(Some("1.5")), None);
    }

    #[test]
    fn rejects_empty_and_missing() {
        assert_eq!(parse_external_id(Some("")), None);
        assert_eq!(parse_external_id(Some("   ")), None);
        assert_eq!(parse_external_id(None), None);
    }

    #[test]
    fn negative_identifiers_parse() {
        // The source system owns the identifier space; nothing here assumes
        // positivity.
        assert_eq!(parse_external_id(Some("-9")), Some(-9));
    }
}
