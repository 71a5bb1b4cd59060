//! # signalr-client
//!
//! Client for the Azure SignalR service in serverless mode.
//!
//! A [`Client`] is bound to one hub. [`Client::listen`] negotiates, opens a
//! WebSocket, performs the protocol handshake and routes inbound invocations
//! to a [`Handler`]. The REST senders ([`Client::broadcast_all`],
//! [`Client::send_to_user`], group membership and friends) can be called
//! concurrently with a running `listen`.
//!
//! ```text
//! let client = Arc::new(Client::new(&conn_str, "chat")?);
//! let handler = Handler::builder(|_, target, args| println!("{target}: {}", args.len()))
//!     .method("echo", |_, (text,): (String,)| println!("{text}"))
//!     .build();
//! client.listen(&handler, CancellationToken::new()).await?;
//! ```

#![deny(unsafe_code)]

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod errors;
pub mod negotiate;
pub mod send;
pub mod transport;

pub use client::{Client, ClientBuilder, websocket_uri};
pub use connection::{ConnectionState, FrameReader, handshake};
pub use dispatch::{FromArguments, Handler, HandlerBuilder, IntoOutcome, InvocationContext};
pub use errors::{ClientError, NegotiationError, Result};
pub use negotiate::{AvailableTransport, NegotiationResult};
pub use transport::{DuplexChannel, MemoryPeer, MemoryTransport, OpenRequest, Transport, WebSocketTransport};

pub use signalr_core::protocol::Envelope;
pub use tokio_util::sync::CancellationToken;
