//! Short-lived HS256 access tokens.
//!
//! Every request gets its own token scoped to the exact URI it targets.
//! Tokens are never cached or reused.

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

/// JWT claims understood by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Not before (Unix timestamp).
    pub nbf: i64,
    /// Expiry (Unix timestamp).
    pub exp: i64,
    /// The URI this token authorizes.
    pub aud: String,
    /// Identity of the caller, used for user addressing.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub nameid: String,
}

impl Claims {
    /// Claims valid from now until now + `ttl`.
    pub fn new(audience: &str, subject: &str, ttl: Duration) -> Result<Self, AuthError> {
        let ttl_secs = ttl.as_secs();
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| AuthError::TtlOutOfRange(ttl_secs))?;
        let now = chrono::Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or(AuthError::TtlOutOfRange(ttl_secs))?;

        Ok(Self {
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires.timestamp(),
            aud: audience.to_string(),
            nameid: subject.to_string(),
        })
    }
}

/// Signs claims with the service access key.
#[derive(Clone)]
pub struct TokenMinter {
    key: EncodingKey,
    subject: String,
}

impl fmt::Debug for TokenMinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenMinter")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl TokenMinter {
    /// Create a minter for `subject` signing with `access_key`.
    pub fn new(access_key: &str, subject: impl Into<String>) -> Result<Self, AuthError> {
        if access_key.is_empty() {
            return Err(AuthError::InvalidKey("access key is empty".to_string()));
        }
        Ok(Self {
            key: EncodingKey::from_secret(access_key.as_bytes()),
            subject: subject.into(),
        })
    }

    /// The `nameid` placed in every token.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Mint a token for `audience` valid for `ttl`.
    pub fn mint(&self, audience: &str, ttl: Duration) -> Result<String, AuthError> {
        let claims = Claims::new(audience, &self.subject, ttl)?;
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;
        tracing::trace!(audience, exp = claims.exp, "minted access token");
        Ok(token)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
