//! Protocol and package constants.

use std::time::Duration;

/// Current version of the client (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hub protocol spoken on the duplex channel.
pub const PROTOCOL_NAME: &str = "json";

/// Hub protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Transport name the service must advertise during negotiation.
pub const WEBSOCKETS_TRANSPORT: &str = "WebSockets";

/// Validity window of every minted token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Ceiling on a single frame read inside the receive loop.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Ceiling on waiting for the handshake response.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);
