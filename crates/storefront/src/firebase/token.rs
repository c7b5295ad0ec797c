//! Reading claims out of Firebase ID tokens.
//!
//! Tokens come straight from the identity service over TLS, so the payload
//! is read without verifying the signature. Anything that grants privileges
//! goes through `IdentityAdmin::verify` instead.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use emporium_core::{Claims, Email, Uid};

use super::FirebaseError;

/// Identity fields carried in an ID token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPayload {
    pub uid: Uid,
    pub email: Option<Email>,
    /// Custom claims only; registered JWT claims are dropped.
    pub claims: Claims,
}

/// Decode the payload segment of an ID token.
///
/// # Errors
///
/// Returns `FirebaseError::Token` if the token does not have three
/// segments, the payload is not base64url JSON, or it has no subject.
pub fn decode_payload(id_token: &str) -> Result<TokenPayload, FirebaseError> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(FirebaseError::Token("expected three segments".to_string())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| FirebaseError::Token(format!("payload is not base64url: {e}")))?;
    let raw: BTreeMap<String, Value> = serde_json::from_slice(&bytes)
        .map_err(|e| FirebaseError::Token(format!("payload is not a JSON object: {e}")))?;

    let uid = raw
        .get("user_id")
        .or_else(|| raw.get("sub"))
        .and_then(Value::as_str)
        .map(Uid::new)
        .ok_or_else(|| FirebaseError::Token("payload has no subject".to_string()))?;
    let email = raw
        .get("email")
        .and_then(Value::as_str)
        .and_then(|e| Email::parse(e).ok());

    Ok(TokenPayload {
        uid,
        email,
        claims: Claims::from(raw).custom_only(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Build an unsigned token with the given payload.
    pub(crate) fn token_with(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_decode_admin_claim() {
        let token = token_with(&serde_json::json!({
            "iss": "https://securetoken.google.com/emporium",
            "sub": "uid-1",
            "user_id": "uid-1",
            "email": "ala@example.com",
            "admin": true,
            "exp": 1_900_000_000
        }));
        let payload = decode_payload(&token).unwrap();
        assert_eq!(payload.uid.as_str(), "uid-1");
        assert_eq!(payload.email.unwrap().as_str(), "ala@example.com");
        assert!(payload.claims.is_admin());
        assert!(payload.claims.get("exp").is_none());
    }

    #[test]
    fn test_decode_without_custom_claims() {
        let token = token_with(&serde_json::json!({"sub": "uid-2"}));
        let payload = decode_payload(&token).unwrap();
        assert!(!payload.claims.is_admin());
        assert!(payload.email.is_none());
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(decode_payload("not-a-token").is_err());
        assert!(decode_payload("a.!!!.c").is_err());
        let no_subject = token_with(&serde_json::json!({"admin": true}));
        assert!(decode_payload(&no_subject).is_err());
    }
}
