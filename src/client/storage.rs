/// Durable storage for the client's token pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::client::error::ClientError;
use crate::contracts::AuthResponse;

/// Persisted session. Fields are optional so a partially written or
/// hand-edited file still loads; restore ignores incomplete sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at_utc: Option<DateTime<Utc>>,
}

impl From<&AuthResponse> for StoredSession {
    fn from(response: &AuthResponse) -> Self {
        Self {
            access_token: Some(response.access_token.clone()),
            refresh_token: Some(response.refresh_token.clone()),
            expires_at_utc: Some(response.expires_at_utc),
        }
    }
}

pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, ClientError>;
    fn save(&self, session: &StoredSession) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// JSON file on disk, surviving restarts.
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_str(&contents)
            .map_err(|e| ClientError::Storage(format!("unreadable session file: {}", e)))?;
        Ok(Some(session))
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Process-local storage for tests and short-lived tools.
#[derive(Default)]
pub struct MemorySessionStorage {
    session: Mutex<Option<StoredSession>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    pub fn current(&self) -> Option<StoredSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        Ok(self.current())
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
