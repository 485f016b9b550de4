//! JWT claim inspection for stored credentials.
//!
//! Only the payload is decoded. Signatures are the server's business; this
//! exists to stop a privileged key from ever leaving the process.

use crate::{AuthError, AuthResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry as unix seconds.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn is_expired_at(&self, now_unix: i64) -> bool {
        matches!(self.exp, Some(exp) if exp <= now_unix)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }
}

/// Decode the payload segment of a JWT.
pub fn decode_claims(token: &str) -> AuthResult<TokenClaims> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken("expected three segments".into()));
    };

    // Some issuers pad anyway.
    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Returns the token's role if it is one of `forbidden`.
///
/// Opaque (non-JWT) credentials carry no role and are never forbidden.
pub fn forbidden_role<S: AsRef<str>>(token: &str, forbidden: &[S]) -> Option<String> {
    let role = decode_claims(token).ok()?.role?;
    forbidden
        .iter()
        .any(|f| f.as_ref() == role)
        .then_some(role)
}
