use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// A registered account holder. One user may own many accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountUser {
    /// Store-assigned numeric id
    pub id: UserId,
    pub name: String,
    /// Unique private identifying number (national id, tax code, ...)
    pub private_number: String,
    pub registered_at: DateTime<Utc>,
}

impl AccountUser {
    pub fn new(id: UserId, name: String, private_number: String) -> Self {
        Self {
            id,
            name,
            private_number,
            registered_at: Utc::now(),
        }
    }
}
