// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication.
//!
//! Tokens are compact HS256 JWTs whose claims carry the user id and role.
//! The middleware verifies them and stores the resulting [`Principal`] in
//! the request extensions. With no secret configured every request is
//! rejected.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use tutorlane_core::{Principal, Role};

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub role: Role,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Why a token was refused. Never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    UnsupportedAlgorithm,
    BadSignature,
    Expired,
}

#[derive(Debug, Deserialize)]
struct JoseHeader {
    alg: String,
}

#[derive(Clone)]
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("secret", &"[redacted]")
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::BadSignature)
    }

    /// Sign `claims` into a compact token.
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = URL_SAFE_NO_PAD.encode(HEADER);
        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?);
        let signing_input = format!("{header}.{payload}");
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify `token` and return the caller it names.
    pub fn verify(&self, token: &str, now: i64) -> Result<Principal, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: JoseHeader = URL_SAFE_NO_PAD
            .decode(header)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or(TokenError::Malformed)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let signing_input = token
            .rsplit_once('.')
            .map(|(input, _)| input)
            .ok_or(TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or(TokenError::Malformed)?;
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(Principal::new(claims.user_id, claims.role))
    }
}

/// Authentication settings shared with the middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub verifier: Option<TokenVerifier>,
}

impl AuthState {
    pub fn from_secret(secret: Option<&str>) -> Self {
        Self {
            verifier: secret.filter(|s| !s.is_empty()).map(TokenVerifier::new),
        }
    }
}

/// Require a valid bearer token and attach its [`Principal`].
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(verifier) = auth.verifier.as_ref() else {
        tracing::error!("no auth.token_secret configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match verifier.verify(token, chrono::Utc::now().timestamp()) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            Ok(next.run(request).await)
        }
        Err(reason) => {
            tracing::debug!(?reason, "bearer token rejected");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp: i64) -> Claims {
        Claims {
            user_id: Uuid::new_v4(),
            role: Role::Student,
            exp,
        }
    }

    #[test]
    fn issued_tokens_verify() {
        let verifier = TokenVerifier::new("s3cret");
        let claims = claims(2_000);
        let token = verifier.issue(&claims).unwrap();
        let principal = verifier.verify(&token, 1_000).unwrap();
        assert_eq!(principal, Principal::new(claims.user_id, Role::Student));
    }

    #[test]
    fn expired_tokens_fail() {
        let verifier = TokenVerifier::new("s3cret");
        let token = verifier.issue(&claims(1_000)).unwrap();
        assert_eq!(verifier.verify(&token, 1_000), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_signature_fails() {
        let token = TokenVerifier::new("other").issue(&claims(2_000)).unwrap();
        assert_eq!(
            TokenVerifier::new("s3cret").verify(&token, 1_000),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn tampered_payload_fails() {
        let verifier = TokenVerifier::new("s3cret");
        let token = verifier.issue(&claims(2_000)).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims {
                role: Role::Admin,
                ..claims(2_000)
            })
            .unwrap(),
        );
        parts[1] = &forged;
        assert_eq!(
            verifier.verify(&parts.join("."), 1_000),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn unsigned_tokens_are_refused() {
        let verifier = TokenVerifier::new("s3cret");
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims(2_000)).unwrap());
        assert_eq!(
            verifier.verify(&format!("{header}.{payload}."), 1_000),
            Err(TokenError::UnsupportedAlgorithm)
        );
        assert_eq!(verifier.verify("abc", 1_000), Err(TokenError::Malformed));
    }

    #[test]
    fn debug_redacts_secret() {
        let state = AuthState::from_secret(Some("s3cret"));
        let debug = format!("{state:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[redacted]"));
        assert!(AuthState::from_secret(Some("")).verifier.is_none());
    }
}
