/// Session Coordinator
///
/// Owns the client's token pair and identity and publishes them through a
/// `watch` channel. Every non-auth call carries the current access token.
/// A 401 on such a call triggers at most one refresh at a time:
///
/// - a refresh already in flight: the call fails immediately, no queueing
/// - no refresh token held: the session is cleared and the call fails
/// - otherwise refresh, then retry the original call once with the new
///   access token; the retry gets no refresh handling of its own
///
/// The in-flight flag belongs to this instance and is cleared when the
/// refresh resolves. A refresh that never resolves leaves it set, so the
/// transport must eventually answer or error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::client::error::ClientError;
use crate::client::identity::{decode_identity, Identity};
use crate::client::storage::{SessionStorage, StoredSession};
use crate::client::transport::{ApiRequest, ApiResponse, Transport};
use crate::contracts::{AuthResponse, RefreshRequest, SigninRequest, SignupRequest};
use crate::domain::UserRole;

/// Calls under this prefix never get a bearer token attached by `send`
/// and never trigger a refresh.
pub const AUTH_PATH_PREFIX: &str = "/auth/";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub identity: Option<Identity>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some() && self.access_token.is_some()
    }

    pub fn role(&self) -> UserRole {
        self.identity.as_ref().map_or(UserRole::Guest, |i| i.role)
    }
}

pub struct SessionCoordinator {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<SessionSnapshot>,
    refresh_in_flight: AtomicBool,
}

impl SessionCoordinator {
    /// Build a coordinator and restore any session held in `storage`.
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        let coordinator = Self {
            transport,
            storage,
            state,
            refresh_in_flight: AtomicBool::new(false),
        };
        coordinator.restore();
        coordinator
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_in_flight.load(Ordering::SeqCst)
    }

    /// Adopt a freshly issued token pair. A pair whose access token cannot
    /// be decoded is refused and leaves the coordinator signed out.
    pub fn apply_session(&self, response: &AuthResponse) -> Result<(), ClientError> {
        let identity = match decode_identity(&response.access_token) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("Issued access token could not be decoded");
                self.clear_session();
                return Err(e.into());
            }
        };

        if let Err(e) = self.storage.save(&StoredSession::from(response)) {
            tracing::warn!("Failed to persist session: {}", e);
        }

        self.state.send_replace(SessionSnapshot {
            access_token: Some(response.access_token.clone()),
            refresh_token: Some(response.refresh_token.clone()),
            identity: Some(identity),
        });
        Ok(())
    }

    pub fn clear_session(&self) {
        if let Err(e) = self.storage.clear() {
            tracing::warn!("Failed to clear stored session: {}", e);
        }
        self.state.send_replace(SessionSnapshot::default());
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ClientError> {
        let response = self.auth_call("/auth/signup", request).await?;
        self.apply_session(&response)?;
        Ok(response)
    }

    pub async fn signin(&self, request: &SigninRequest) -> Result<AuthResponse, ClientError> {
        match self.auth_call("/auth/signin", request).await {
            Ok(response) => {
                self.apply_session(&response)?;
                Ok(response)
            }
            Err(e) => {
                self.clear_session();
                Err(e)
            }
        }
    }

    /// Exchange the held refresh token for a new pair. Any failure signs
    /// the coordinator out.
    pub async fn refresh(&self) -> Result<AuthResponse, ClientError> {
        let Some(refresh_token) = self.snapshot().refresh_token else {
            self.clear_session();
            return Err(ClientError::NotAuthenticated);
        };

        let request = RefreshRequest { refresh_token };
        match self.auth_call("/auth/refresh", &request).await {
            Ok(response) => {
                self.apply_session(&response)?;
                Ok(response)
            }
            Err(e) => {
                self.clear_session();
                Err(e)
            }
        }
    }

    /// Revoke the held refresh token. The local session is cleared whether
    /// or not the server call succeeds.
    ///
    /// An expired access token does not fail the logout: the held refresh
    /// token is exchanged once and the fresh pair is revoked instead. A
    /// refresh token the server no longer accepts leaves nothing to revoke.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let snapshot = self.snapshot();
        let result = match self.revoke(snapshot.access_token, snapshot.refresh_token.clone()).await {
            Err(e) if e.is_unauthorized() => match snapshot.refresh_token {
                Some(refresh_token) => self.renew_and_revoke(refresh_token).await,
                None => Ok(()),
            },
            other => other,
        };
        self.clear_session();
        result
    }

    /// Send `request`, attaching    /// Send `request`, attaching the current access token and recovering
    /// from a 401 per the refresh protocol. Non-2xx outcomes are errors.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let is_auth_call = request.path.starts_with(AUTH_PATH_PREFIX);

        let mut outgoing = request.clone();
        if !is_auth_call {
            if let Some(token) = self.snapshot().access_token {
                outgoing.bearer = Some(token);
            }
        }

        let response = self.transport.execute(outgoing).await?;
        if !response.is_unauthorized() || is_auth_call {
            return response.error_for_status();
        }

        if self.is_refreshing() {
            tracing::debug!(path = %request.path, "Refresh already in flight; failing call");
            return Err(response.into_error());
        }

        if self.snapshot().refresh_token.is_none() {
            self.clear_session();
            return Err(response.into_error());
        }

        if self
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(response.into_error());
        }

        let refreshed = self.refresh().await;
        self.refresh_in_flight.store(false, Ordering::SeqCst);
        let session = refreshed?;

        tracing::debug!(path = %request.path, "Retrying after refresh");
        let retry = request.with_bearer(session.access_token);
        self.transport.execute(retry).await?.error_for_status()
    }

    /// `send` and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        self.send(request).await?.json()
    }

    fn restore(&self) {
        let stored = match self.storage.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Discarding unreadable stored session: {}", e);
                self.clear_session();
                return;
            }
        };

        let non_empty = |t: Option<String>| t.filter(|t| !t.is_empty());
        let (Some(access_token), Some(refresh_token)) =
            (non_empty(stored.access_token), non_empty(stored.refresh_token))
        else {
            return;
        };

        match decode_identity(&access_token) {
            Ok(identity) => {
                self.state.send_replace(SessionSnapshot {
                    access_token: Some(access_token),
                    refresh_token: Some(refresh_token),
                    identity: Some(identity),
                });
            }
            Err(_) => {
                tracing::warn!("Stored access token could not be decoded; discarding session");
                self.clear_session();
            }
        }
    }

    async fn revoke(&self, bearer: Option<String>, refresh_token: Option<String>) -> Result<(), ClientError> {
        let body = json!({ "refreshToken": refresh_token.unwrap_or_default() });
        let mut request = ApiRequest::post("/auth/logout", body);
        request.bearer = bearer;

        self.transport.execute(request).await?.error_for_status()?;
        Ok(())
    }

    async fn renew_and_revoke(&self, refresh_token: String) -> Result<(), ClientError> {
        tracing::debug!("Access token rejected at logout; renewing to revoke");
        let request = RefreshRequest { refresh_token };
        match self.auth_call("/auth/refresh", &request).await {
            Ok(pair) => self.revoke(Some(pair.access_token), Some(pair.refresh_token)).await,
            Err(e) if e.is_unauthorized() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn auth_call<B: Serialize>(&self, path: &str, body: &B) -> Result<AuthResponse, ClientError> {
        let request = ApiRequest::post(path, serde_json::to_value(body)?);
        self.transport.execute(request).await?.error_for_status()?.json()
    }
}
