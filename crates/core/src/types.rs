/// All database primary keys are SQLite INTEGER rowids.
pub type DbId = i64;

/// External identifiers are 64-bit integers assigned by the source system.
pub type ExternalId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
