//! Request identity from the `x-token` header.
//!
//! Tokens are HS256 JWTs issued by the identity front end. The payload
//! carries `{"user": {"id": "<provider subject>", "email": "..."}}` and an
//! optional `exp` (seconds since the epoch).

use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use biodesk_core::AuthPrincipal;

use crate::{ApiError, AppState};

/// Header carrying the identity token.
pub const TOKEN_HEADER: &str = "x-token";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token could not be signed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    user: AuthPrincipal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Verifies (and, for tooling, signs) HS256 identity tokens.
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> biodesk_core::Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(biodesk_core::Error::Config(
                "Invalid JWT secret: must not be empty".to_string(),
            ));
        }

        // `exp` is optional; when present it is enforced without leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Verify a token and return the identity it carries.
    pub fn verify(&self, token: &str) -> Result<AuthPrincipal, TokenError> {
        decode::<TokenClaims>(token.trim(), &self.decoding_key, &self.validation)
            .map(|data| data.claims.user)
            .map_err(TokenError::from)
    }

    /// Issue a token for `principal`.
    pub fn sign(&self, principal: &AuthPrincipal, exp: Option<i64>) -> Result<String, TokenError> {
        let claims = TokenClaims {
            user: principal.clone(),
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

/// Extractor for the verified caller identity.
///
/// Missing header → 400 `token not found`; invalid token → 401.
pub struct AuthUser(pub AuthPrincipal);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("token not found".to_string()))?;

        state.tokens.verify(token).map(AuthUser).map_err(|e| {
            tracing::debug!(subsystem = "auth", error = %e, "Token rejected");
            ApiError::Unauthorized("Invalid token".to_string())
        })
    }
}
