/// Authentication flow: signup, signin, refresh, logout
///
/// Every call is independent. The only shared state is the user directory
/// and the refresh token store. Access tokens always reflect the user's
/// role at the moment they are issued, so a role change reaches a session
/// on its next refresh or signin.

use std::sync::Arc;

use crate::auth::jwt::AccessTokenIssuer;
use crate::auth::password::CredentialHasher;
use crate::auth::refresh_token::RefreshTokenStore;
use crate::contracts::{AuthResponse, RefreshRequest, SigninRequest, SignupRequest};
use crate::domain::User;
use crate::error::{AppError, AuthError};
use crate::users::UserDirectory;

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    hasher: Arc<dyn CredentialHasher>,
    issuer: AccessTokenIssuer,
    refresh_tokens: RefreshTokenStore,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        hasher: Arc<dyn CredentialHasher>,
        issuer: AccessTokenIssuer,
        refresh_tokens: RefreshTokenStore,
    ) -> Self {
        Self {
            users,
            hasher,
            issuer,
            refresh_tokens,
        }
    }

    #[tracing::instrument(name = "auth.signup", skip_all)]
    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, AppError> {
        let (email, role) = request.validate()?;

        if self.users.get_by_email(&email).await?.is_some() {
            tracing::info!("Signup rejected for an already registered email");
            return Err(AppError::Conflict("Email is already registered.".to_string()));
        }

        let password_hash = self.hash_password(request.password.clone()).await?;
        let user = User::new(&email, password_hash, role);
        self.users.add(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User signed up");
        self.issue_pair(&user).await
    }

    #[tracing::instrument(name = "auth.signin", skip_all)]
    pub async fn signin(&self, request: &SigninRequest) -> Result<AuthResponse, AppError> {
        let email = request.validate()?;

        let Some(user) = self.users.get_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials.into());
        };

        if !self
            .verify_password(request.password.clone(), user.password_hash.clone())
            .await?
        {
            return Err(AuthError::InvalidCredentials.into());
        }

        tracing::info!(user_id = %user.id, "User signed in");
        self.issue_pair(&user).await
    }

    #[tracing::instrument(name = "auth.refresh", skip_all)]
    pub async fn refresh(&self, request: &RefreshRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;

        let Some(user_id) = self
            .refresh_tokens
            .validate_and_rotate(&request.refresh_token)
            .await?
        else {
            return Err(AuthError::InvalidRefreshToken.into());
        };

        // The account may have been removed after the token was issued
        let Some(user) = self.users.get_by_id(user_id).await? else {
            tracing::warn!(user_id = %user_id, "Refresh token outlived its user");
            return Err(AuthError::InvalidRefreshToken.into());
        };

        tracing::info!(user_id = %user.id, role = %user.role, "Session refreshed");
        self.issue_pair(&user).await
    }

    /// Revoke `refresh_token`. Blank or unknown tokens are a no-op.
    #[tracing::instrument(name = "auth.logout", skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        if refresh_token.trim().is_empty() {
            return Ok(());
        }
        self.refresh_tokens.revoke(refresh_token).await
    }

    async fn issue_pair(&self, user: &User) -> Result<AuthResponse, AppError> {
        let access = self.issuer.issue(user)?;
        let refresh_token = self.refresh_tokens.create(user.id).await?;

        Ok(AuthResponse {
            access_token: access.token,
            refresh_token,
            expires_at_utc: access.expires_at,
        })
    }

    // bcrypt is deliberately slow; keep it off the async workers
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = Arc::clone(&self.hasher);
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?)
    }
}
