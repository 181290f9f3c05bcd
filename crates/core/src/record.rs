//! Canonical row payload consumed by the batch writer.

use serde::{Deserialize, Serialize};

use crate::fields::{CanonicalField, HeaderMapping};
use crate::types::ExternalId;

/// A validated row's canonical payload.
///
/// Ephemeral: built per row during the sync pass, consumed by the batch
/// writer, discarded after the flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub external_id: ExternalId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub cart_number: String,
}

impl UserRecord {
    /// Extract a record from a raw row using the resolved header mapping.
    ///
    /// Missing cells and unmapped optional fields yield empty strings; the
    /// identifier has already been parsed and validated by the caller.
    pub fn from_row(external_id: ExternalId, row: &[&str], mapping: &HeaderMapping) -> Self {
        let cell = |field: CanonicalField| -> String {
            mapping
                .column(field)
                .and_then(|index| row.get(index))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };

        Self {
            external_id,
            email: cell(CanonicalField::Email),
            first_name: cell(CanonicalField::FirstName),
            last_name: cell(CanonicalField::LastName),
            cart_number: cell(CanonicalField::CartNumber),
        }
    }
}
