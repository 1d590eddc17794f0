/// Client-side session handling
///
/// Holds the current token pair and decoded identity, persists them, and
/// refreshes transparently when a call fails with 401.

mod coordinator;
mod error;
mod identity;
mod storage;
mod transport;

pub use coordinator::{SessionCoordinator, SessionSnapshot, AUTH_PATH_PREFIX};
pub use error::ClientError;
pub use identity::{decode_identity, Identity, InvalidSession, ROLE_CLAIM_KEYS};
pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage, StoredSession};
pub use transport::{
    extract_error_message, extract_field_errors, ApiRequest, ApiResponse, ReqwestTransport, Transport,
    FALLBACK_ERROR_MESSAGE,
};
