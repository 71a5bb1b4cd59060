//! Duplex text channel capability.
//!
//! The receive loop only needs to open a channel, exchange text frames and
//! close it. [`websocket::WebSocketTransport`] is the production
//! implementation; [`memory::MemoryTransport`] drives the loop in tests.

pub mod memory;
pub mod websocket;

use async_trait::async_trait;
use signalr_core::TransportError;

pub use memory::{MemoryPeer, MemoryTransport, OpenRequest};
pub use websocket::WebSocketTransport;

/// Opens duplex channels.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a channel to `uri`, authenticating with `bearer`.
    async fn open(&self, uri: &str, bearer: &str) -> Result<Box<dyn DuplexChannel>, TransportError>;
}

/// An open, message-oriented text channel.
#[async_trait]
pub trait DuplexChannel: Send {
    /// Send one text message.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Receive the next text message. `None` once the peer has closed.
    async fn recv_text(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the channel. Closing twice is not an error.
    async fn close(&mut self) -> Result<(), TransportError>;
}
