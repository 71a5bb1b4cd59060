//! Handshake messages exchanged once per connection.

use serde::{Deserialize, Serialize};

use crate::constants::{PROTOCOL_NAME, PROTOCOL_VERSION};

/// First frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Hub protocol name.
    pub protocol: String,
    /// Hub protocol version.
    pub version: u32,
}

impl Default for HandshakeRequest {
    fn default() -> Self {
        Self {
            protocol: PROTOCOL_NAME.to_string(),
            version: PROTOCOL_VERSION,
        }
    }
}

/// The service's answer to [`HandshakeRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Present and non-empty when the handshake failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandshakeResponse {
    /// The error text, if the service rejected the handshake.
    pub fn rejection(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_frame, encode_frame};

    #[test]
    fn request_wire_format() {
        let frame = encode_frame(&HandshakeRequest::default()).unwrap();
        assert_eq!(frame, "{\"protocol\":\"json\",\"version\":1}\u{1e}");
    }

    #[test]
    fn empty_response_is_accepted() {
        let resp: HandshakeResponse = decode_frame("{}\u{1e}").unwrap();
        assert!(resp.rejection().is_none());
    }

    #[test]
    fn empty_error_string_is_not_a_rejection() {
        let resp: HandshakeResponse = decode_frame(r#"{"error":""}"#).unwrap();
        assert!(resp.rejection().is_none());
    }

    #[test]
    fn error_is_a_rejection() {
        let resp: HandshakeResponse =
            decode_frame("{\"error\":\"Requested protocol 'xml' is not available.\"}\u{1e}").unwrap();
        assert_eq!(
            resp.rejection(),
            Some("Requested protocol 'xml' is not available.")
        );
    }
}
