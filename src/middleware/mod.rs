/// Middleware module
///
/// Role gate for protected routes.

mod access_gate;

pub use access_gate::{bearer_token, AccessGate};
