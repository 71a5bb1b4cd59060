//! Client settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use signalr_auth::AudienceRole;

/// Everything needed to build a client, plus protocol timing knobs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// `Endpoint=...;AccessKey=...;Version=...;`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    /// Hub name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub: Option<String>,
    /// Display name used for user addressing. A UUID is generated when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Audience role.
    pub role: AudienceRole,
    /// Ceiling on a single frame read, in milliseconds.
    pub read_timeout_ms: u64,
    /// Ceiling on the handshake response, in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Validity window of minted tokens, in seconds.
    pub token_ttl_secs: u64,
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("hub", &self.hub)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .field("handshake_timeout_ms", &self.handshake_timeout_ms)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connection_string: None,
            hub: None,
            name: None,
            role: AudienceRole::Client,
            read_timeout_ms: 5_000,
            handshake_timeout_ms: 15_000,
            token_ttl_secs: 7_200,
        }
    }
}

impl ClientSettings {
    /// Per-read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Handshake timeout as a [`Duration`].
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Token lifetime as a [`Duration`].
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}
