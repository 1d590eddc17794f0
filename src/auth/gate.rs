/// Role-based access decisions
///
/// Decisions are made from the access token alone; there is no user lookup.
/// A role change therefore only shows up here once the caller holds a token
/// issued after the change.

use crate::auth::claims::Claims;
use crate::auth::jwt::AccessTokenVerifier;
use crate::domain::UserRole;
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Carries the verified claims, or `None` for an anonymous caller.
    Allow(Option<Claims>),
    Deny(DenyReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated(AuthError),
    Forbidden { required: Vec<UserRole> },
}

impl From<DenyReason> for AppError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated(e) => AppError::Auth(e),
            DenyReason::Forbidden { required } => AppError::Forbidden { required },
        }
    }
}

/// Decide whether the bearer of `access_token` may call an operation
/// requiring one of `required`.
///
/// An empty `required` set admits any authenticated caller, and anonymous
/// callers too when no token is presented. A presented token is always
/// verified first.
pub fn authorize(
    verifier: &AccessTokenVerifier,
    access_token: Option<&str>,
    required: &[UserRole],
) -> AccessDecision {
    let Some(token) = access_token else {
        return if required.is_empty() {
            AccessDecision::Allow(None)
        } else {
            AccessDecision::Deny(DenyReason::Unauthenticated(AuthError::MissingToken))
        };
    };

    let claims = match verifier.verify(token) {
        Ok(claims) => claims,
        Err(e) => return AccessDecision::Deny(DenyReason::Unauthenticated(e)),
    };

    if required.is_empty() {
        return AccessDecision::Allow(Some(claims));
    }

    match claims.role() {
        Some(role) if required.contains(&role) => AccessDecision::Allow(Some(claims)),
        _ => AccessDecision::Deny(DenyReason::Forbidden {
            required: required.to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::AccessTokenIssuer;
    use crate::configuration::JwtSettings;
    use crate::domain::{User, ADMIN_ONLY, EDITOR_OR_ADMIN};

    fn config() -> JwtSettings {
        JwtSettings {
            secret: "gate-test-secret-with-enough-length!!".to_string(),
            issuer: "blog".to_string(),
            audience: "blog-clients".to_string(),
            access_token_minutes: 15,
            clock_skew_seconds: 30,
        }
    }

    fn token_for(role: UserRole) -> String {
        let user = User::new("someone@example.com", "hash".to_string(), role);
        AccessTokenIssuer::new(&config()).issue(&user).unwrap().token
    }

    #[test]
    fn anonymous_caller_allowed_on_open_operation() {
        let verifier = AccessTokenVerifier::new(&config());
        assert_eq!(authorize(&verifier, None, &[]), AccessDecision::Allow(None));
    }

    #[test]
    fn anonymous_caller_denied_on_protected_operation() {
        let verifier = AccessTokenVerifier::new(&config());
        assert_eq!(
            authorize(&verifier, None, ADMIN_ONLY),
            AccessDecision::Deny(DenyReason::Unauthenticated(AuthError::MissingToken))
        );
    }

    #[test]
    fn invalid_token_is_unauthenticated_even_when_open() {
        let verifier = AccessTokenVerifier::new(&config());
        assert_eq!(
            authorize(&verifier, Some("garbage"), &[]),
            AccessDecision::Deny(DenyReason::Unauthenticated(AuthError::InvalidAccessToken))
        );
    }

    #[test]
    fn role_membership_is_explicit() {
        let verifier = AccessTokenVerifier::new(&config());
        let admin = token_for(UserRole::Admin);
        let editor = token_for(UserRole::Editor);
        let guest = token_for(UserRole::Guest);

        assert!(matches!(authorize(&verifier, Some(&admin), ADMIN_ONLY), AccessDecision::Allow(Some(_))));
        assert!(matches!(authorize(&verifier, Some(&editor), EDITOR_OR_ADMIN), AccessDecision::Allow(Some(_))));
        assert!(matches!(authorize(&verifier, Some(&admin), EDITOR_OR_ADMIN), AccessDecision::Allow(Some(_))));

        // No hierarchy: Admin does not satisfy an Editor-only requirement
        assert_eq!(
            authorize(&verifier, Some(&admin), &[UserRole::Editor]),
            AccessDecision::Deny(DenyReason::Forbidden {
                required: vec![UserRole::Editor]
            })
        );
        assert!(matches!(
            authorize(&verifier, Some(&guest), EDITOR_OR_ADMIN),
            AccessDecision::Deny(DenyReason::Forbidden { .. })
        ));
    }

    #[test]
    fn any_authenticated_role_passes_empty_requirement() {
        let verifier = AccessTokenVerifier::new(&config());
        let guest = token_for(UserRole::Guest);

        match authorize(&verifier, Some(&guest), &[]) {
            AccessDecision::Allow(Some(claims)) => assert_eq!(claims.role(), Some(UserRole::Guest)),
            other => panic!("expected allow, got {:?}", other),
        }
    }

    #[test]
    fn deny_reasons_map_to_http_errors() {
        let forbidden: AppError = DenyReason::Forbidden { required: vec![UserRole::Admin] }.into();
        assert!(matches!(forbidden, AppError::Forbidden { .. }));

        let unauthenticated: AppError = DenyReason::Unauthenticated(AuthError::MissingToken).into();
        assert!(matches!(unauthenticated, AppError::Auth(AuthError::MissingToken)));
    }
}
