//! # signalr-core
//!
//! Shared vocabulary for the SignalR service client:
//!
//! - **Connection strings**: [`conn_str::ConnectionString`]
//! - **Wire protocol**: [`protocol::Envelope`], [`protocol::MessageKind`], frame codec, handshake
//! - **Errors**: [`errors`] taxonomy via `thiserror`
//! - **Logging**: [`logging::init_subscriber`] and test capture utilities
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by every other signalr crate.

#![deny(unsafe_code)]

pub mod conn_str;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod protocol;

pub use conn_str::ConnectionString;
pub use errors::{
    BoxError, ConfigError, DispatchError, HandshakeError, ProtocolError, SendFailure,
    TransportError,
};
