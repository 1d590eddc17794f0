/// Password Hashing and Verification
///
/// bcrypt embeds its salt and cost in the hash string, so verification
/// needs nothing but the stored hash.

use crate::error::{AppError, InfrastructureError};

/// One-way password hashing used by the authentication flow
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AppError>;

    /// `false` for a wrong password and for a malformed stored hash.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| InfrastructureError::Hashing(e.to_string()).into())
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match bcrypt::verify(password, hash) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash could not be parsed");
                false
            }
        }
    }
}
