/// Access token claims
///
/// The payload carried by every access token. The verifier trusts these
/// fields only after signature, issuer, audience and expiry checks pass.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{User, UserRole};
use crate::error::{AppError, AuthError};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iss: String,
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user: &User, issuer: &str, audience: &str, issued_at: i64, expires_at: i64) -> Self {
        Self {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            exp: expires_at,
            iat: issued_at,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidAccessToken.into())
    }

    /// `None` when the claim holds something other than a known role name.
    pub fn role(&self) -> Option<UserRole> {
        UserRole::from_name(&self.role)
    }
}
