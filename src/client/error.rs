use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use crate::client::identity::InvalidSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response.
    Transport(String),
    /// The server answered with a non-success status.
    Api {
        status: u16,
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },
    /// A token's claims could not be decoded into an identity.
    InvalidSession,
    /// No refresh token is held.
    NotAuthenticated,
    Decode(String),
    Storage(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(msg) => write!(f, "Request failed: {}", msg),
            ClientError::Api { message, .. } => write!(f, "{}", message),
            ClientError::InvalidSession => write!(f, "Session could not be decoded."),
            ClientError::NotAuthenticated => write!(f, "Not signed in."),
            ClientError::Decode(msg) => write!(f, "Unexpected response: {}", msg),
            ClientError::Storage(msg) => write!(f, "Session storage error: {}", msg),
        }
    }
}

impl StdError for ClientError {}

impl From<InvalidSession> for ClientError {
    fn from(_: InvalidSession) -> Self {
        ClientError::InvalidSession
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}
