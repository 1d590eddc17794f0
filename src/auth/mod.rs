/// Authentication module
///
/// Credential hashing, access token issuance and verification, the
/// refresh token store, the authentication flow, and the role gate.

mod claims;
mod flow;
mod gate;
mod jwt;
mod password;
mod refresh_token;
mod store;

pub use claims::Claims;
pub use flow::AuthService;
pub use gate::{authorize, AccessDecision, DenyReason};
pub use jwt::{AccessTokenIssuer, AccessTokenVerifier, IssuedAccessToken};
pub use password::{BcryptHasher, CredentialHasher};
pub use refresh_token::RefreshTokenStore;
pub use store::{InMemoryKeyValueStore, KeyValueStore, RedisKeyValueStore};
