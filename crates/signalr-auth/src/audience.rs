//! Audience roles and the URIs tokens are scoped to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which side of the hub the client authenticates as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudienceRole {
    /// Application server role.
    Server,
    /// Connected client role.
    #[default]
    Client,
}

impl AudienceRole {
    /// Path segment for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for AudienceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudienceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "client" => Ok(Self::Client),
            other => Err(format!("unknown audience role: {other}")),
        }
    }
}

/// Audience of the duplex channel: `{endpoint}/{role}/?hub={hub}`.
///
/// The hub is lower-cased; the service treats hub names case-insensitively
/// and validates the audience literally.
pub fn compute_audience(endpoint: &str, role: AudienceRole, hub: &str) -> String {
    format!("{endpoint}/{role}/?hub={}", hub.to_lowercase())
}

/// Base of the REST API: `{endpoint}/api/v1/hubs/{hub}`.
pub fn rest_base(endpoint: &str, hub: &str) -> String {
    format!("{endpoint}/api/v1/hubs/{}", hub.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_lowercases_hub() {
        assert_eq!(
            compute_audience("https://x.service.signalr.net", AudienceRole::Client, "Chat"),
            "https://x.service.signalr.net/client/?hub=chat"
        );
    }

    #[test]
    fn server_audience() {
        assert_eq!(
            compute_audience("https://x.net", AudienceRole::Server, "hub1"),
            "https://x.net/server/?hub=hub1"
        );
    }

    #[test]
    fn rest_base_lowercases_hub() {
        assert_eq!(
            rest_base("https://x.net", "MyHub"),
            "https://x.net/api/v1/hubs/myhub"
        );
    }

    #[test]
    fn role_defaults_to_client() {
        assert_eq!(AudienceRole::default(), AudienceRole::Client);
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Server".parse::<AudienceRole>(), Ok(AudienceRole::Server));
        assert!("admin".parse::<AudienceRole>().is_err());
    }
}
