/// Authentication Routes
///
/// Thin HTTP wrappers around `AuthService`. Request validation, generic
/// failure messages and token issuance all live in the service.

use actix_web::{web, HttpResponse};

use crate::auth::{AuthService, Claims};
use crate::contracts::{RefreshRequest, SigninRequest, SignupRequest};
use crate::error::AppError;

/// POST /auth/signup
///
/// # Errors
/// - 400: invalid email, password outside 8..=128 chars, unknown role
/// - 409: email already registered
pub async fn signup(
    form: web::Json<SignupRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let response = auth.signup(&form).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /auth/signin
///
/// # Errors
/// - 400: malformed email or missing password
/// - 401: unknown email or wrong password, with one shared message
pub async fn signin(
    form: web::Json<SigninRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let response = auth.signin(&form).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /auth/refresh
///
/// Exchanges a refresh token for a new pair. The presented token is
/// consumed; presenting it again fails.
///
/// # Errors
/// - 400: missing refresh token
/// - 401: unknown, expired, or already used token, or the user is gone
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let response = auth.refresh(&form).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /auth/logout
///
/// Requires a valid access token. Always 204 for a blank, unknown, or
/// already revoked refresh token.
pub async fn logout(
    claims: web::ReqData<Claims>,
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.logout(&form.refresh_token).await?;
    tracing::info!(user_id = %claims.sub, "User logged out");
    Ok(HttpResponse::NoContent().finish())
}
