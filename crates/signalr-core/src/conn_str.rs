//! Service connection strings.
//!
//! Format: `Endpoint=https://x.service.signalr.net;AccessKey=...;Version=1.0;`
//! in any key order, trailing `;` optional. Values may contain `=`; only the
//! first one in a segment separates key from value.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::errors::ConfigError;

/// Fields extracted from a connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Service endpoint without a trailing slash.
    pub endpoint: String,
    /// Symmetric signing key.
    pub access_key: String,
    /// Service API version, if given.
    pub version: Option<String>,
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint)
            .field("access_key", &"<redacted>")
            .field("version", &self.version)
            .finish()
    }
}

impl ConnectionString {
    /// Parse a connection string.
    pub fn parse(conn_str: &str) -> Result<Self, ConfigError> {
        let trimmed = conn_str.strip_suffix(';').unwrap_or(conn_str);

        let mut endpoint = None;
        let mut access_key = None;
        let mut version = None;

        for segment in trimmed.split(';') {
            let Some((key, value)) = segment.split_once('=') else {
                return Err(ConfigError::MissingSeparator {
                    segment: segment.to_string(),
                });
            };
            match key {
                "Endpoint" => endpoint = Some(validate_endpoint(value)?),
                "AccessKey" => access_key = Some(value.to_string()),
                "Version" => version = Some(value.to_string()),
                other => return Err(ConfigError::UnknownKey(other.to_string())),
            }
        }

        Ok(Self {
            endpoint: endpoint.ok_or(ConfigError::MissingField("Endpoint"))?,
            access_key: access_key.ok_or(ConfigError::MissingField("AccessKey"))?,
            version,
        })
    }
}

impl FromStr for ConnectionString {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check that `value` is an absolute http(s) URL with a host and no query,
/// fragment or credentials. Returns it normalised (lower-case scheme and host,
/// no trailing slash) so paths can be appended to it.
pub fn validate_endpoint(value: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEndpoint {
        endpoint: value.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(value).map_err(|e| invalid(&e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme {other}"))),
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(invalid("must not contain credentials"));
    }
    if parsed.query().is_some() {
        return Err(invalid("must not contain a query"));
    }
    if parsed.fragment().is_some() {
        return Err(invalid("must not contain a fragment"));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
