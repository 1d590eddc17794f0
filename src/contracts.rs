/// Wire contracts for the authentication and user endpoints
///
/// Field names are camelCase on the wire. The same types are used by the
/// HTTP handlers and by the client-side session coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{User, UserRole};
use crate::error::{AppError, ValidationErrors};
use crate::validators::{
    validate_email, validate_new_password, validate_presented_password, validate_refresh_token,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl SignupRequest {
    /// Returns the normalized email and the requested role.
    pub fn validate(&self) -> Result<(String, UserRole), AppError> {
        let mut errors = ValidationErrors::new();
        let email = errors.check(validate_email(&self.email));
        errors.check(validate_new_password(&self.password));
        let role = errors.check(UserRole::parse_optional(self.role.as_deref()));

        match (email, role) {
            (Some(email), Some(role)) if errors.is_empty() => Ok((email, role)),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

impl SigninRequest {
    /// Returns the normalized email.
    pub fn validate(&self) -> Result<String, AppError> {
        let mut errors = ValidationErrors::new();
        let email = errors.check(validate_email(&self.email));
        errors.check(validate_presented_password(&self.password));

        match email {
            Some(email) if errors.is_empty() => Ok(email),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// Body of both `/auth/refresh` and `/auth/logout`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

impl RefreshRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_refresh_token(&self.refresh_token).map_err(AppError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRoleRequest {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            created_at_utc: user.created_at,
            updated_at_utc: user.updated_at,
        }
    }
}
