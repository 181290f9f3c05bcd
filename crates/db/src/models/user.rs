//! User entity model.

use serde::Serialize;
use serde_json::json;
use sqlx::FromRow;

use roster_core::types::{DbId, ExternalId, Timestamp};

/// Full user row from the `users` table.
///
/// `deleted_at` null means active; a non-null value marks a soft-deleted
/// row whose uniqueness constraints remain in force. `email` and
/// `cart_number` are `None` when the source file carried no value.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: DbId,
    pub external_id: ExternalId,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub cart_number: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Field snapshot used as the `previous` side of update/restore log
    /// contexts.
    pub fn snapshot(&self) -> serde_json::Value {
        json!({
            "external_id": self.external_id,
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "cart_number": self.cart_number,
        })
    }
}
