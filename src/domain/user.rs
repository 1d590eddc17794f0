use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::UserRole;

/// Account record owned by the user directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    /// Always stored normalized, see [`normalize_email`]
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn change_role(&mut self, role: UserRole) {
        self.role = role;
        self.updated_at = Utc::now();
    }
}

/// Canonical form used for uniqueness and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
