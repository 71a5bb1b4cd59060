//! Error types shared by every SignalR crate.
//!
//! Each concern gets its own enum so callers can match on the failure class
//! they care about. The client crate folds them into a single `ClientError`.

use thiserror::Error;

/// Boxed error returned by application handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Malformed or incomplete connection configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A `;`-separated segment had no `=`.
    #[error("connection string segment {segment:?} did not have a '=' between the ';', so it's malformed")]
    MissingSeparator {
        /// The offending segment.
        segment: String,
    },

    /// A key other than `Endpoint`, `AccessKey` or `Version`.
    #[error("unknown connection string key: {0}")]
    UnknownKey(String),

    /// A required field was absent.
    #[error("connection string is missing {0}")]
    MissingField(&'static str),

    /// The endpoint is not an absolute http(s) URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// The endpoint as given.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Failure of the duplex channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel could not be opened.
    #[error("failed to open channel to {uri}: {reason}")]
    Open {
        /// Target URI.
        uri: String,
        /// Error description.
        reason: String,
    },

    /// Reading a frame failed.
    #[error("failed to read frame: {0}")]
    Read(String),

    /// Writing a frame failed.
    #[error("failed to write frame: {0}")]
    Write(String),

    /// The peer closed the channel without a close message.
    #[error("channel closed by peer")]
    Closed,

    /// No frame arrived within the per-read ceiling.
    #[error("timed out after {timeout_ms}ms waiting for a frame")]
    ReadTimeout {
        /// How long we waited.
        timeout_ms: u64,
    },

    /// The caller cancelled while the channel was being set up.
    #[error("cancelled before the channel was ready")]
    Cancelled,
}

/// Failure of the protocol handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The service answered with a non-empty error.
    #[error("handshake rejected: {0}")]
    Rejected(String),

    /// The response frame was not valid JSON.
    #[error("invalid handshake response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A message the client cannot or will not process.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Stream item, completion, stream invocation or cancel invocation.
    #[error("unhandled message type: {0}")]
    UnhandledMessageType(crate::protocol::MessageKind),

    /// The frame body was not a valid envelope.
    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound value could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Error surfaced by an application handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The handler returned an error for `target`.
    #[error("handler for {target:?} failed: {source}")]
    Handler {
        /// The invocation target.
        target: String,
        /// The handler's error.
        #[source]
        source: BoxError,
    },
}

/// Non-success HTTP response from the service.
///
/// Carries the status and the raw body verbatim so callers can inspect them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to send message with status code {status_code} and body: {body:?}")]
pub struct SendFailure {
    /// HTTP status code.
    pub status_code: u16,
    /// Raw response body.
    pub body: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
