/// Access Token Issuance and Verification
///
/// Access tokens are HS256 JWTs signed with a secret shared between the
/// issuer and the verifier. Nothing is recorded server-side about issued
/// tokens; a token is valid exactly when its signature, issuer, audience
/// and expiry check out.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::domain::User;
use crate::error::{AuthError, AppError, InfrastructureError};

/// A freshly signed access token and the instant it stops being valid
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AccessTokenIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl AccessTokenIssuer {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: Duration::minutes(config.access_token_minutes),
        }
    }

    /// Sign a token carrying the user's id, email and *current* role.
    pub fn issue(&self, user: &User) -> Result<IssuedAccessToken, AppError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedAccessToken, AppError> {
        let expires_at = now + self.lifetime;
        let claims = Claims::for_user(
            user,
            &self.issuer,
            &self.audience,
            now.timestamp(),
            expires_at.timestamp(),
        );

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| InfrastructureError::TokenSigning(e.to_string()))?;

        Ok(IssuedAccessToken { token, expires_at })
    }
}

#[derive(Clone)]
pub struct AccessTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokenVerifier {
    pub fn new(config: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = config.effective_clock_skew();

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Check signature, issuer, audience and expiry, then return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AuthError::InvalidAccessToken
            })
    }
}
