//! The client identity and its construction.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use signalr_auth::{AudienceRole, TokenMinter, compute_audience};
use signalr_core::constants::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_TOKEN_TTL};
use signalr_core::{ConfigError, ConnectionString};
use signalr_settings::{ClientSettings, load_settings, load_settings_from_path};
use tokio::sync::RwLock;
use url::Url;

use crate::errors::Result;
use crate::negotiate::NegotiationResult;
use crate::transport::{Transport, WebSocketTransport};

/// Characters left unescaped in a URI path segment or query value.
pub(crate) const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Parse `uri` and swap its `https`/`http` scheme for `wss`/`ws`.
pub fn websocket_uri(uri: &str) -> std::result::Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        endpoint: uri.to_string(),
        reason,
    };

    let mut parsed = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;
    let scheme = match parsed.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(invalid(format!("unsupported scheme {other}"))),
    };
    parsed
        .set_scheme(scheme)
        .map_err(|()| invalid(format!("cannot switch to {scheme}")))?;
    Ok(parsed)
}

/// An addressable endpoint of one hub.
///
/// Cheap to share behind an [`Arc`]; `listen` and the senders only need
/// `&self`. Connection info from negotiation is fetched once and cached for
/// the lifetime of the client.
pub struct Client {
    pub(crate) name: String,
    pub(crate) hub: String,
    pub(crate) role: AudienceRole,
    pub(crate) endpoint: String,
    pub(crate) minter: TokenMinter,
    pub(crate) http: reqwest::Client,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) read_timeout: Duration,
    pub(crate) handshake_timeout: Duration,
    pub(crate) token_ttl: Duration,
    pub(crate) negotiation: RwLock<Option<Arc<NegotiationResult>>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name)
            .field("hub", &self.hub)
            .field("role", &self.role)
            .field("endpoint", &self.endpoint)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Client for `hub` with default options.
    pub fn new(connection_string: &str, hub: impl Into<String>) -> Result<Self> {
        Self::builder(connection_string, hub)?.build()
    }

    /// Start configuring a client for `hub`.
    pub fn builder(connection_string: &str, hub: impl Into<String>) -> Result<ClientBuilder> {
        let conn = ConnectionString::parse(connection_string)?;
        Ok(ClientBuilder::new(conn, hub.into()))
    }

    /// Build a client from loaded settings.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let conn_str = settings
            .connection_string
            .as_deref()
            .ok_or(ConfigError::MissingField("connectionString"))?;
        let hub = settings
            .hub
            .clone()
            .ok_or(ConfigError::MissingField("hub"))?;

        let mut builder = Self::builder(conn_str, hub)?
            .role(settings.role)
            .read_timeout(settings.read_timeout())
            .handshake_timeout(settings.handshake_timeout())
            .token_ttl(settings.token_ttl());
        if let Some(name) = &settings.name {
            builder = builder.name(name.clone());
        }
        builder.build()
    }

    /// Build a client from `~/.signalr/settings.json` and `SIGNALR_*`
    /// environment overrides.
    pub fn from_default_settings() -> Result<Self> {
        Self::from_settings(&load_settings()?)
    }

    /// Build a client from the settings file at `path`, with `SIGNALR_*`
    /// environment overrides applied on top.
    pub fn from_settings_file(path: &Path) -> Result<Self> {
        Self::from_settings(&load_settings_from_path(path)?)
    }

    /// Display name, sent as `nameid` in every token.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hub name as configured.
    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// Audience role.
    pub fn role(&self) -> AudienceRole {
        self.role
    }

    /// Service endpoint without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Audience of the negotiate and channel tokens.
    pub fn channel_audience(&self) -> String {
        compute_audience(&self.endpoint, self.role, &self.hub)
    }

    /// `{endpoint}/{role}/negotiate?hub={hub}`.
    pub fn negotiate_uri(&self) -> Result<Url> {
        let raw = format!("{}/{}/negotiate", self.endpoint, self.role);
        let mut uri = Url::parse(&raw).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        let _ = uri.query_pairs_mut().append_pair("hub", &self.hub);
        Ok(uri)
    }

    /// WebSocket URI for a negotiated connection.
    pub fn channel_uri(&self, connection_id: &str) -> Result<Url> {
        let mut uri = websocket_uri(&self.channel_audience())?;
        let _ = uri.query_pairs_mut().append_pair("id", connection_id);
        Ok(uri)
    }
}

/// Options for [`Client`].
pub struct ClientBuilder {
    conn: ConnectionString,
    hub: String,
    name: Option<String>,
    role: AudienceRole,
    http: Option<reqwest::Client>,
    transport: Option<Arc<dyn Transport>>,
    read_timeout: Duration,
    handshake_timeout: Duration,
    token_ttl: Duration,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("conn", &self.conn)
            .field("hub", &self.hub)
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    fn new(conn: ConnectionString, hub: String) -> Self {
        Self {
            conn,
            hub,
            name: None,
            role: AudienceRole::default(),
            http: None,
            transport: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Display name. Defaults to a fresh UUID.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Audience role. Defaults to [`AudienceRole::Client`].
    #[must_use]
    pub fn role(mut self, role: AudienceRole) -> Self {
        self.role = role;
        self
    }

    /// Share an existing HTTP client.
    #[must_use]
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Replace the WebSocket transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Ceiling on each frame read while listening.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Ceiling on the handshake response.
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Validity window of minted tokens.
    #[must_use]
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Finish construction.
    pub fn build(self) -> Result<Client> {
        if self.hub.trim().is_empty() {
            return Err(ConfigError::MissingField("hub").into());
        }
        let name = self
            .name
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        let minter = TokenMinter::new(&self.conn.access_key, name.clone())?;
        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .min_tls_version(reqwest::tls::Version::TLS_1_2)
                .pool_max_idle_per_host(10)
                .build()?,
        };

        Ok(Client {
            name,
            hub: self.hub,
            role: self.role,
            endpoint: self.conn.endpoint,
            minter,
            http,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(WebSocketTransport)),
            read_timeout: self.read_timeout,
            handshake_timeout: self.handshake_timeout,
            token_ttl: self.token_ttl,
            negotiation: RwLock::new(None),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
