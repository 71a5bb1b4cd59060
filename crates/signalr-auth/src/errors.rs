//! Auth error types.

/// Errors that can occur while minting access tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The signing key is unusable.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// JWT encoding failed.
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The requested validity window does not fit a timestamp.
    #[error("token lifetime out of range: {0}s")]
    TtlOutOfRange(u64),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_key_display() {
        let err = AuthError::InvalidKey("empty".to_string());
        assert_eq!(err.to_string(), "invalid signing key: empty");
    }

    #[test]
    fn ttl_display() {
        let err = AuthError::TtlOutOfRange(u64::MAX);
        assert!(err.to_string().contains("out of range"));
    }
}
