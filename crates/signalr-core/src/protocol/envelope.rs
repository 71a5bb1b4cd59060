//! The hub protocol message exchanged over the duplex channel.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Message-kind discriminant carried in the `type` field.
///
/// Any integer decodes; codes outside the protocol become [`Self::Unknown`]
/// so newer service versions cannot break the receive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MessageKind {
    /// Invoke a target on the receiver.
    Invocation,
    /// One item of a stream.
    StreamItem,
    /// Result of an invocation.
    Completion,
    /// Invoke a streaming target.
    StreamInvocation,
    /// Cancel a streaming invocation.
    CancelInvocation,
    /// Keep-alive.
    Ping,
    /// The sender is closing the connection.
    Close,
    /// A code this client does not know.
    Unknown(i64),
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl MessageKind {
    /// Wire code of this kind.
    pub fn code(self) -> i64 {
        match self {
            Self::Invocation => 1,
            Self::StreamItem => 2,
            Self::Completion => 3,
            Self::StreamInvocation => 4,
            Self::CancelInvocation => 5,
            Self::Ping => 6,
            Self::Close => 7,
            Self::Unknown(code) => code,
        }
    }

    /// Protocol name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invocation => "invocation",
            Self::StreamItem => "streamItem",
            Self::Completion => "completion",
            Self::StreamInvocation => "streamInvocation",
            Self::CancelInvocation => "cancelInvocation",
            Self::Ping => "ping",
            Self::Close => "close",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<i64> for MessageKind {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::Invocation,
            2 => Self::StreamItem,
            3 => Self::Completion,
            4 => Self::StreamInvocation,
            5 => Self::CancelInvocation,
            6 => Self::Ping,
            7 => Self::Close,
            other => Self::Unknown(other),
        }
    }
}

impl From<MessageKind> for i64 {
    fn from(kind: MessageKind) -> Self {
        kind.code()
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

/// One protocol message.
///
/// Arguments stay as raw JSON until a handler decides which types they
/// decode into.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Message kind. A missing `type` decodes as `Unknown(0)`.
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Optional headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Invocation id for invocations expecting a completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    /// Target method name.
    #[serde(default)]
    pub target: String,
    /// Positional arguments, undecoded.
    #[serde(default)]
    pub arguments: Vec<Box<RawValue>>,
    /// Error text (close and completion messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// An envelope of `kind` with every optional field empty.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            headers: None,
            invocation_id: None,
            target: String::new(),
            arguments: Vec::new(),
            error: None,
        }
    }

    /// An invocation of `target` with no arguments yet.
    ///
    /// ```ignore
    /// let msg = Envelope::invocation("Println").arg(&"hello")?;
    /// ```
    pub fn invocation(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::new(MessageKind::Invocation)
        }
    }

    /// A close message, optionally carrying an error.
    pub fn close(error: Option<String>) -> Self {
        Self {
            error,
            ..Self::new(MessageKind::Close)
        }
    }

    /// Append one argument, serialized to JSON.
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.arguments.push(serde_json::value::to_raw_value(value)?);
        Ok(self)
    }

    /// Set a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self
            .headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.headers == other.headers
            && self.invocation_id == other.invocation_id
            && self.target == other.target
            && self.error == other.error
            && self.arguments.len() == other.arguments.len()
            && self
                .arguments
                .iter()
                .zip(&other.arguments)
                .all(|(a, b)| a.get() == b.get())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
