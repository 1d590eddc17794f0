/// Access Gate Middleware
///
/// Runs the role gate before a protected route's handler. On success the
/// verified claims are placed in request extensions for `web::ReqData<Claims>`.
/// Denials are answered here and never reach the handler.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{authorize, AccessDecision, AccessTokenVerifier, DenyReason};
use crate::domain::UserRole;
use crate::error::{AppError, AuthError, InfrastructureError};

/// Gate wrapping a resource or scope with its required-role set.
/// Anonymous callers never pass a gated route.
#[derive(Clone, Copy)]
pub struct AccessGate {
    required: &'static [UserRole],
}

impl AccessGate {
    /// Any caller holding a valid access token.
    pub fn authenticated() -> Self {
        Self { required: &[] }
    }

    /// Callers whose role claim is one of `roles`.
    pub fn require(roles: &'static [UserRole]) -> Self {
        Self { required: roles }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AccessGateService {
            service: Rc::new(service),
            gate: *self,
        }))
    }
}

pub struct AccessGateService<S> {
    service: Rc<S>,
    gate: AccessGate,
}

impl<S, B> Service<ServiceRequest> for AccessGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(verifier) = req.app_data::<web::Data<AccessTokenVerifier>>().cloned() else {
            return deny(
                req,
                InfrastructureError::Task("access token verifier is not registered".to_string()).into(),
            );
        };

        let Some(token) = bearer_token(&req) else {
            tracing::debug!(path = %req.path(), "Request without bearer token");
            return deny(req, AuthError::MissingToken.into());
        };

        match authorize(&verifier, Some(&token), self.gate.required) {
            AccessDecision::Allow(claims) => {
                if let Some(claims) = claims {
                    tracing::debug!(user_id = %claims.sub, role = %claims.role, "Access granted");
                    req.extensions_mut().insert(claims);
                }
                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            AccessDecision::Deny(reason) => {
                if let DenyReason::Forbidden { .. } = &reason {
                    tracing::info!(path = %req.path(), "Access denied for role");
                }
                deny(req, reason.into())
            }
        }
    }
}

fn deny<B: 'static>(
    req: ServiceRequest,
    err: AppError,
) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>> {
    let response = req.error_response(err).map_into_right_body();
    Box::pin(async move { Ok(response) })
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
