//! Canonical field definitions and header-to-field mapping.
//!
//! The input file carries an arbitrary column order and loosely named
//! headers. Each canonical field owns a synonym list; the first field whose
//! list contains a (lower-cased) raw header claims that column index.
//! Mapping succeeds only when every mandatory field ends up with a resolved
//! index.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

/// A canonical field of the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    ExternalId,
    Email,
    FirstName,
    LastName,
    CartNumber,
}

impl CanonicalField {
    /// Return the field name as used in log messages and the store schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExternalId => "external_id",
            Self::Email => "email",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::CartNumber => "cart_number",
        }
    }

    /// Parse a field name string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "external_id" => Some(Self::ExternalId),
            "email" => Some(Self::Email),
            "first_name" => Some(Self::FirstName),
            "last_name" => Some(Self::LastName),
            "cart_number" => Some(Self::CartNumber),
            _ => None,
        }
    }

    /// All canonical fields, in record order.
    pub const ALL: &'static [CanonicalField] = &[
        Self::ExternalId,
        Self::Email,
        Self::FirstName,
        Self::LastName,
        Self::CartNumber,
    ];
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Field specs
// ---------------------------------------------------------------------------

/// Describes how one canonical field is matched against file headers.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: CanonicalField,
    /// Lower-case header values that resolve to this field.
    pub synonyms: Vec<String>,
    /// Mandatory fields must have a resolved column before processing.
    pub mandatory: bool,
}

impl FieldSpec {
    fn new(field: CanonicalField, synonyms: &[&str], mandatory: bool) -> Self {
        Self {
            field,
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            mandatory,
        }
    }
}

/// The built-in synonym table. The identifier and cart number are the only
/// mandatory columns; name and email columns are applied when present.
pub fn default_field_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(CanonicalField::ExternalId, &["id"], true),
        FieldSpec::new(CanonicalField::Email, &["user email", "email"], false),
        FieldSpec::new(CanonicalField::FirstName, &["first name", "name"], false),
        FieldSpec::new(CanonicalField::LastName, &["last name", "surname"], false),
        FieldSpec::new(CanonicalField::CartNumber, &["card number", "card"], true),
    ]
}

// ---------------------------------------------------------------------------
// Header mapping
// ---------------------------------------------------------------------------

/// Resolved column index per canonical field.
#[derive(Debug, Clone, Default)]
pub struct HeaderMapping {
    columns: [Option<usize>; CanonicalField::ALL.len()],
}

impl HeaderMapping {
    /// The resolved column index for a field, if the header mapped one.
    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns[field as usize]
    }

    fn set(&mut self, field: CanonicalField, index: usize) {
        self.columns[field as usize] = Some(index);
    }
}

/// Result of scanning the header row against the field specs.
#[derive(Debug)]
pub struct HeaderScan {
    pub mapping: HeaderMapping,
    /// Non-fatal: headers that matched no synonym.
    pub warnings: Vec<String>,
    /// Fatal: mandatory fields with no resolved column. The caller must not
    /// proceed to data rows when this is non-empty.
    pub errors: Vec<String>,
}

impl HeaderScan {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Match the raw header row against the field specs.
///
/// Headers are compared lower-cased against each spec's synonym list; a
/// later header matching an already-claimed field overwrites the earlier
/// claim. Errors are collected, not fail-fast, so the operator sees every
/// missing mandatory column in one pass.
pub fn map_header(headers: &[String], specs: &[FieldSpec]) -> HeaderScan {
    let mut mapping = HeaderMapping::default();
    let mut warnings = Vec::new();

    for (index, raw) in headers.iter().enumerate() {
        let value = raw.trim().to_lowercase();
        let matched = specs
            .iter()
            .find(|spec| spec.synonyms.iter().any(|s| s == &value));

        match matched {
            Some(spec) => mapping.set(spec.field, index),
            None => warnings.push(format!("Unable to match column: {value}")),
        }
    }

    let errors = specs
        .iter()
        .filter(|spec| spec.mandatory && mapping.column(spec.field).is_none())
        .map(|spec| format!("Not found match for mandatory field: {}", spec.field))
        .collect();

    HeaderScan {
        mapping,
        warnings,
        errors,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
