/// Error Handling Module
///
/// One error type, `AppError`, crosses every module seam. Domain failures
/// (validation, conflict, authentication, authorization, not found) are
/// rendered as typed HTTP responses; infrastructure faults are logged with
/// their detail and surfaced as a generic fault.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use crate::domain::UserRole;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    InvalidRole(String),
    MalformedBody(String),
}

impl ValidationError {
    /// Name of the offending field, used as the key in the response map.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField(field)
            | ValidationError::TooShort(field, _)
            | ValidationError::TooLong(field, _)
            | ValidationError::InvalidFormat(field)
            | ValidationError::InvalidRole(field) => field,
            ValidationError::MalformedBody(_) => "body",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} must not be empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::InvalidRole(_) => {
                write!(f, "Role must be one of: guest, editor, admin.")
            }
            ValidationError::MalformedBody(detail) => write!(f, "Malformed request body: {}", detail),
        }
    }
}

impl StdError for ValidationError {}

/// All validation failures collected for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Record the error side of `result`, if any.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected failures.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }

    /// Field name to messages, in field order.
    pub fn field_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in &self.0 {
            map.entry(error.field().to_string())
                .or_default()
                .push(error.to_string());
        }
        map
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        Self(vec![err])
    }
}

/// Authentication failures. Every variant renders one fixed message so
/// callers cannot tell an unknown account from a wrong password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    InvalidRefreshToken,
    MissingToken,
    InvalidAccessToken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials."),
            AuthError::InvalidRefreshToken => write!(f, "Invalid refresh token."),
            AuthError::MissingToken => write!(f, "Missing authentication token."),
            AuthError::InvalidAccessToken => write!(f, "Invalid or expired token."),
        }
    }
}

impl StdError for AuthError {}

/// Faults in the collaborators the core depends on
#[derive(Debug)]
pub enum InfrastructureError {
    Database(String),
    Store(String),
    KeyCollision,
    Hashing(String),
    TokenSigning(String),
    Task(String),
}

impl fmt::Display for InfrastructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfrastructureError::Database(msg) => write!(f, "Database error: {}", msg),
            InfrastructureError::Store(msg) => write!(f, "Key-value store error: {}", msg),
            InfrastructureError::KeyCollision => {
                write!(f, "Refresh token key already present in store")
            }
            InfrastructureError::Hashing(msg) => write!(f, "Password hashing failed: {}", msg),
            InfrastructureError::TokenSigning(msg) => write!(f, "Token signing failed: {}", msg),
            InfrastructureError::Task(msg) => write!(f, "Background task failed: {}", msg),
        }
    }
}

impl StdError for InfrastructureError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationErrors),
    Conflict(String),
    Auth(AuthError),
    Forbidden { required: Vec<UserRole> },
    NotFound(String),
    Infrastructure(InfrastructureError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Conflict(msg) => write!(f, "{}", msg),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Forbidden { required } => {
                if required.is_empty() {
                    write!(f, "Insufficient role.")
                } else {
                    let names: Vec<&str> = required.iter().map(|r| r.as_str()).collect();
                    write!(f, "Insufficient role. Required one of: {}.", names.join(", "))
                }
            }
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::Infrastructure(e) => write!(f, "{}", e),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.into())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<InfrastructureError> for AppError {
    fn from(err: InfrastructureError) -> Self {
        AppError::Infrastructure(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::Conflict("Email is already registered.".to_string());
            }
        }
        AppError::Infrastructure(InfrastructureError::Database(err.to_string()))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Infrastructure(InfrastructureError::Store(err.to_string()))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Infrastructure(InfrastructureError::Task(err.to_string()))
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error body returned for every failed request
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Unique id, also present in the server log line for this error
    pub error_id: String,
    pub message: String,
    /// Stable code for client-side handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            errors: None,
        }
    }

    pub fn with_field_errors(mut self, errors: BTreeMap<String, Vec<String>>) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Converts errors to HTTP responses with matching log lines
pub trait ErrorHandler {
    fn error_response(&self, error_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, error_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, error_id: &str) -> (StatusCode, ErrorResponse) {
        let status = ResponseError::status_code(self);
        let (code, message) = match self {
            AppError::Validation(_) => ("VALIDATION_ERROR", "One or more validation errors occurred.".to_string()),
            AppError::Conflict(msg) => ("CONFLICT", msg.clone()),
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => ("INVALID_CREDENTIALS", e.to_string()),
                AuthError::InvalidRefreshToken => ("INVALID_REFRESH_TOKEN", e.to_string()),
                AuthError::MissingToken => ("MISSING_TOKEN", e.to_string()),
                AuthError::InvalidAccessToken => ("TOKEN_INVALID", e.to_string()),
            },
            AppError::Forbidden { .. } => ("FORBIDDEN", self.to_string()),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::Infrastructure(InfrastructureError::Store(_)) => (
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable.".to_string(),
            ),
            AppError::Infrastructure(_) => (
                "INTERNAL_ERROR",
                "An unexpected error occurred.".to_string(),
            ),
        };

        let mut response = ErrorResponse::new(
            error_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );
        if let AppError::Validation(errors) = self {
            response = response.with_field_errors(errors.field_map());
        }

        (status, response)
    }

    fn log_error(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Validation error");
            }
            AppError::Conflict(msg) => {
                tracing::warn!(error_id = error_id, error = %msg, "Conflict");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(error_id = error_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Authentication error");
            }
            AppError::Forbidden { .. } => {
                tracing::warn!(error_id = error_id, error = %self, "Authorization denied");
            }
            AppError::NotFound(msg) => {
                tracing::debug!(error_id = error_id, error = %msg, "Not found");
            }
            AppError::Infrastructure(e) => {
                tracing::error!(error_id = error_id, error = %e, "Infrastructure fault");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&error_id);

        let (status, body) = <Self as ErrorHandler>::error_response(self, &error_id);
        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Infrastructure(InfrastructureError::Store(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `JsonConfig` error handler: undecodable bodies become validation errors.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    AppError::from(ValidationError::MalformedBody(err.to_string())).into()
}
