/// Identity decoded from an access token's payload.
///
/// The client never verifies the signature; it only reads claims to know
/// who is signed in. Any decode problem is an `InvalidSession`.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::{Map, Value};

use crate::domain::UserRole;

/// Role claim keys in priority order. The second is the namespaced key
/// some token issuers emit instead of `role`.
pub const ROLE_CLAIM_KEYS: [&str; 2] = [
    "role",
    "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
];

const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSession;

pub fn decode_identity(token: &str) -> Result<Identity, InvalidSession> {
    let payload = token.split('.').nth(1).ok_or(InvalidSession)?;
    let bytes = PAYLOAD_ENGINE.decode(payload).map_err(|_| InvalidSession)?;
    let claims: Map<String, Value> = serde_json::from_slice(&bytes).map_err(|_| InvalidSession)?;

    let id = non_empty_str(&claims, "sub").ok_or(InvalidSession)?;
    let email = non_empty_str(&claims, "email").ok_or(InvalidSession)?;

    // Unrecognised or missing roles read as Guest
    let role = ROLE_CLAIM_KEYS
        .iter()
        .find_map(|key| claims.get(*key).and_then(Value::as_str))
        .and_then(UserRole::from_name)
        .unwrap_or(UserRole::Guest);

    Ok(Identity {
        id: id.to_string(),
        email: email.to_string(),
        role,
    })
}

fn non_empty_str<'a>(claims: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    claims.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn token(payload: Value) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.signature",
            URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    #[test]
    fn decodes_standard_claims() {
        let identity = decode_identity(&token(json!({
            "sub": "42", "email": "a@b.com", "role": "Editor"
        })))
        .unwrap();

        assert_eq!(
            identity,
            Identity {
                id: "42".to_string(),
                email: "a@b.com".to_string(),
                role: UserRole::Editor,
            }
        );
    }

    #[test]
    fn falls_back_to_namespaced_role_claim() {
        let identity = decode_identity(&token(json!({
            "sub": "42",
            "email": "a@b.com",
            "http://schemas.microsoft.com/ws/2008/06/identity/claims/role": "admin"
        })))
        .unwrap();
        assert_eq!(identity.role, UserRole::Admin);
    }

    #[test]
    fn plain_role_claim_wins() {
        let identity = decode_identity(&token(json!({
            "sub": "42",
            "email": "a@b.com",
            "role": "Editor",
            "http://schemas.microsoft.com/ws/2008/06/identity/claims/role": "Admin"
        })))
        .unwrap();
        assert_eq!(identity.role, UserRole::Editor);
    }

    #[test]
    fn unknown_or_missing_role_is_guest() {
        let unknown = decode_identity(&token(json!({"sub": "1", "email": "a@b.com", "role": "root"}))).unwrap();
        let missing = decode_identity(&token(json!({"sub": "1", "email": "a@b.com"}))).unwrap();
        assert_eq!(unknown.role, UserRole::Guest);
        assert_eq!(missing.role, UserRole::Guest);
    }

    #[test]
    fn padded_payload_is_accepted() {
        let padded = base64::engine::general_purpose::URL_SAFE
            .encode(json!({"sub": "1", "email": "a@b.com"}).to_string());
        assert!(decode_identity(&format!("h.{}.s", padded)).is_ok());
    }

    #[test]
    fn rejects_missing_subject_or_email() {
        assert_eq!(decode_identity(&token(json!({"email": "a@b.com"}))), Err(InvalidSession));
        assert_eq!(decode_identity(&token(json!({"sub": "1", "email": ""}))), Err(InvalidSession));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(decode_identity("not-a-token"), Err(InvalidSession));
        assert_eq!(decode_identity("a.%%%.c"), Err(InvalidSession));
        assert_eq!(decode_identity(&format!("a.{}.c", URL_SAFE_NO_PAD.encode("[1,2]"))), Err(InvalidSession));
    }
}
