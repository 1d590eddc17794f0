/// Refresh Token Management
///
/// Refresh tokens are:
/// - 48 bytes from the OS RNG, hex encoded (what the client holds)
/// - Stored under the SHA-256 digest of the secret, value = owning user id
/// - Expired by the store's TTL
/// - Single-use: `validate_and_rotate` removes the entry atomically
///
/// Rotation does not create the replacement; the caller does that with
/// `create`. A crash between the two leaves the user without a refresh
/// token and they must sign in again.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::store::KeyValueStore;
use crate::configuration::{RedisSettings, RefreshTokenSettings};
use crate::error::{AppError, InfrastructureError};

const TOKEN_BYTES: usize = 48;

#[derive(Clone)]
pub struct RefreshTokenStore {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    ttl: Duration,
}

impl RefreshTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key_prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            ttl,
        }
    }

    pub fn from_settings(
        store: Arc<dyn KeyValueStore>,
        redis: &RedisSettings,
        refresh: &RefreshTokenSettings,
    ) -> Self {
        let days = refresh.expiration_days.max(1) as u64;
        Self::new(store, redis.key_prefix.clone(), Duration::from_secs(days * 24 * 60 * 60))
    }

    /// Mint a new refresh token for `user_id` and return the secret.
    pub async fn create(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = generate_refresh_token();
        let stored = self
            .store
            .set_if_absent(&self.key_for(&token), &user_id.to_string(), self.ttl)
            .await?;

        if !stored {
            tracing::error!(user_id = %user_id, "Refresh token key collision");
            return Err(InfrastructureError::KeyCollision.into());
        }

        Ok(token)
    }

    /// Consume `token`. Returns the owning user id on the first call only;
    /// unknown, expired, or already-used tokens yield `None`.
    pub async fn validate_and_rotate(&self, token: &str) -> Result<Option<Uuid>, AppError> {
        if token.trim().is_empty() {
            return Ok(None);
        }

        let Some(value) = self.store.get_and_delete(&self.key_for(token)).await? else {
            tracing::info!("Refresh token not found, expired, or already used");
            return Ok(None);
        };

        match Uuid::parse_str(&value) {
            Ok(user_id) => Ok(Some(user_id)),
            Err(_) => {
                tracing::warn!("Refresh token entry held a malformed user id");
                Ok(None)
            }
        }
    }

    /// Delete `token` if present.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.store.delete(&self.key_for(token)).await
    }

    fn key_for(&self, token: &str) -> String {
        format!("{}:refresh:{}", self.key_prefix, hash_token(token))
    }
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

/// Never keep the plaintext secret in the store.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
