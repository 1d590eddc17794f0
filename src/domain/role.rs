use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Account role carried in access-token claims.
///
/// There is no hierarchy: a gate that should admit both Editors and Admins
/// must list both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Guest,
    Editor,
    Admin,
}

pub const EDITOR_OR_ADMIN: &[UserRole] = &[UserRole::Editor, UserRole::Admin];
pub const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Guest => "Guest",
            UserRole::Editor => "Editor",
            UserRole::Admin => "Admin",
        }
    }

    /// Case-insensitive match against the three role names.
    pub fn from_name(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "guest" => Some(UserRole::Guest),
            "editor" => Some(UserRole::Editor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Role requested at signup. Absent or blank means Guest.
    pub fn parse_optional(input: Option<&str>) -> Result<Self, ValidationError> {
        match input.map(str::trim) {
            None | Some("") => Ok(UserRole::Guest),
            Some(value) => {
                Self::from_name(value).ok_or_else(|| ValidationError::InvalidRole("role".to_string()))
            }
        }
    }

    /// Role supplied to an admin role update. Blank is rejected.
    pub fn parse_required(input: &str) -> Result<Self, ValidationError> {
        if input.trim().is_empty() {
            return Err(ValidationError::EmptyField("role".to_string()));
        }
        Self::from_name(input).ok_or_else(|| ValidationError::InvalidRole("role".to_string()))
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
