//! Client error taxonomy.

use signalr_auth::AuthError;
use signalr_core::{
    ConfigError, DispatchError, HandshakeError, ProtocolError, SendFailure, TransportError,
};
use signalr_settings::SettingsError;
use thiserror::Error;

/// Failure to obtain connection info from the service.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The negotiate endpoint answered with a non-success status.
    #[error("negotiation rejected: {0}")]
    Rejected(#[from] SendFailure),

    /// The service does not offer the WebSockets transport.
    #[error("WebSockets transport is not supported by the service")]
    TransportNotSupported,

    /// The response body was not a negotiation result.
    #[error("invalid negotiation response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Every way a client operation can fail.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad connection string or client configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The settings file could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Token minting failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Negotiation failed.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    /// The duplex channel failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The protocol handshake failed.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// A frame could not be processed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An application handler failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A REST call got a non-success status.
    #[error(transparent)]
    Send(#[from] SendFailure),

    /// The service closed the connection with an error message.
    #[error("{0}")]
    ServerClosed(String),

    /// The HTTP request itself failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn server_closed_displays_only_the_message() {
        let err = ClientError::ServerClosed("bye".into());
        assert_eq!(err.to_string(), "bye");
    }

    #[test]
    fn send_failure_is_transparent() {
        let err: ClientError = SendFailure {
            status_code: 404,
            body: "not found".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "failed to send message with status code 404 and body: \"not found\""
        );
        assert_matches!(err, ClientError::Send(SendFailure { status_code: 404, .. }));
    }

    #[test]
    fn negotiation_rejection_wraps_send_failure() {
        let err = NegotiationError::from(SendFailure {
            status_code: 401,
            body: "unauthorized".into(),
        });
        assert!(err.to_string().starts_with("negotiation rejected: "));
    }

    #[test]
    fn transport_not_supported_display() {
        let err: ClientError = NegotiationError::TransportNotSupported.into();
        assert_eq!(
            err.to_string(),
            "WebSockets transport is not supported by the service"
        );
    }
}
