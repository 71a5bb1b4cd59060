//! Handshake and receive loop.
//!
//! `listen` walks the connection through
//! `Idle → Negotiated → TokenIssued → ChannelOpen → Handshaken → Listening`
//! and ends in `Closed` or `Failed`. Transitions only move forward.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use signalr_core::protocol::{
    Envelope, HandshakeRequest, HandshakeResponse, MessageKind, encode_frame, split_frames,
};
use signalr_core::{HandshakeError, ProtocolError, TransportError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::client::Client;
use crate::dispatch::{Handler, InvocationContext};
use crate::errors::{ClientError, Result};
use crate::transport::DuplexChannel;

/// Where a `listen` call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing done yet.
    Idle,
    /// Connection info obtained.
    Negotiated,
    /// Channel token minted.
    TokenIssued,
    /// Duplex channel open.
    ChannelOpen,
    /// Handshake accepted.
    Handshaken,
    /// Reading frames.
    Listening,
    /// Ended without error.
    Closed,
    /// Ended with an error.
    Failed,
}

impl ConnectionState {
    /// Lower-case name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Negotiated => "negotiated",
            Self::TokenIssued => "token_issued",
            Self::ChannelOpen => "channel_open",
            Self::Handshaken => "handshaken",
            Self::Listening => "listening",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Negotiated => 1,
            Self::TokenIssued => 2,
            Self::ChannelOpen => 3,
            Self::Handshaken => 4,
            Self::Listening => 5,
            Self::Closed | Self::Failed => 6,
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct StateTracker {
    state: ConnectionState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            state: ConnectionState::Idle,
        }
    }

    fn advance(&mut self, next: ConnectionState) {
        if self.state.is_terminal() || next.rank() <= self.state.rank() {
            warn!(from = %self.state, to = %next, "ignoring backward state transition");
            return;
        }
        debug!(from = %self.state, to = %next, "connection state");
        self.state = next;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Framing over a channel
// ─────────────────────────────────────────────────────────────────────────────

/// Splits channel messages into frames.
///
/// One text message may carry several terminated frames; they are handed
/// out one at a time in arrival order. Splitting follows
/// [`split_frames`], so an empty frame is passed on and rejected by the
/// decoder rather than skipped.
pub struct FrameReader {
    channel: Box<dyn DuplexChannel>,
    pending: VecDeque<String>,
}

impl fmt::Debug for FrameReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameReader")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl FrameReader {
    /// Wrap an open channel.
    pub fn new(channel: Box<dyn DuplexChannel>) -> Self {
        Self {
            channel,
            pending: VecDeque::new(),
        }
    }

    /// Write one frame.
    pub async fn send(&mut self, frame: String) -> Result<()> {
        Ok(self.channel.send_text(frame).await?)
    }

    /// Next frame with its terminator removed, waiting at most `timeout`.
    pub async fn next_frame(&mut self, timeout: Duration) -> Result<String> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            let text = tokio::time::timeout(timeout, self.channel.recv_text())
                .await
                .map_err(|_| TransportError::ReadTimeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })??
                .ok_or(TransportError::Closed)?;
            self.pending.extend(split_frames(&text).map(str::to_owned));
        }
    }

    /// Close the underlying channel.
    pub async fn close(&mut self) -> Result<()> {
        Ok(self.channel.close().await?)
    }
}

/// Exchange the protocol handshake. Must precede any application frame.
pub async fn handshake(reader: &mut FrameReader, timeout: Duration) -> Result<()> {
    let request = encode_frame(&HandshakeRequest::default()).map_err(ProtocolError::Encode)?;
    reader.send(request).await?;

    let frame = reader.next_frame(timeout).await?;
    let response: HandshakeResponse =
        serde_json::from_str(&frame).map_err(HandshakeError::Decode)?;
    if let Some(error) = response.rejection() {
        return Err(HandshakeError::Rejected(error.to_string()).into());
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Receive loop
// ─────────────────────────────────────────────────────────────────────────────

impl Client {
    /// Connect and process inbound frames until closed, failed or cancelled.
    ///
    /// Returns `Ok(())` when the service closes without an error or when
    /// `cancel` fires while waiting for a frame. Cancellation before the
    /// channel is ready is a [`TransportError::Cancelled`]. The channel is
    /// closed on every exit path.
    #[tracing::instrument(skip_all, fields(hub = %self.hub, name = %self.name))]
    pub async fn listen(&self, handler: &Handler, cancel: CancellationToken) -> Result<()> {
        let mut state = StateTracker::new();
        let result = self.connect_and_serve(handler, &cancel, &mut state).await;
        match &result {
            Ok(()) => state.advance(ConnectionState::Closed),
            Err(e) => {
                warn!(error = %e, state = %state.state, "listen failed");
                state.advance(ConnectionState::Failed);
            }
        }
        result
    }

    async fn connect_and_serve(
        &self,
        handler: &Handler,
        cancel: &CancellationToken,
        state: &mut StateTracker,
    ) -> Result<()> {
        let negotiation = self.negotiate_once().await?;
        state.advance(ConnectionState::Negotiated);

        let token = self.minter.mint(&self.channel_audience(), self.token_ttl)?;
        state.advance(ConnectionState::TokenIssued);

        let uri = self.channel_uri(&negotiation.connection_id)?;
        let channel = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransportError::Cancelled.into()),
            opened = self.transport.open(uri.as_str(), &token) => opened?,
        };
        state.advance(ConnectionState::ChannelOpen);
        info!(connection_id = %negotiation.connection_id, "channel open");

        let mut reader = FrameReader::new(channel);
        let result = self.serve(&mut reader, handler, cancel, state).await;
        if let Err(e) = reader.close().await {
            debug!(error = %e, "closing channel failed");
        }
        result
    }

    async fn serve(
        &self,
        reader: &mut FrameReader,
        handler: &Handler,
        cancel: &CancellationToken,
        state: &mut StateTracker,
    ) -> Result<()> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransportError::Cancelled.into()),
            shaken = handshake(reader, self.handshake_timeout) => shaken?,
        }
        state.advance(ConnectionState::Handshaken);

        if cancel.is_cancelled() {
            return Ok(());
        }
        handler.start();
        state.advance(ConnectionState::Listening);

        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("listen cancelled");
                    return Ok(());
                }
                frame = reader.next_frame(self.read_timeout) => frame?,
            };

            let envelope: Envelope = serde_json::from_str(&frame).map_err(ProtocolError::Decode)?;
            metrics::counter!("signalr_messages_received_total", "kind" => envelope.kind.as_str())
                .increment(1);

            match envelope.kind {
                MessageKind::Ping => trace!("ping"),
                MessageKind::Invocation => {
                    let ctx = InvocationContext {
                        cancel: cancel.clone(),
                        invocation_id: envelope.invocation_id,
                        headers: envelope.headers.unwrap_or_default(),
                    };
                    debug!(method = %envelope.target, args = envelope.arguments.len(), "invocation");
                    handler.dispatch(&ctx, &envelope.target, &envelope.arguments)?;
                }
                MessageKind::Close => {
                    return match envelope.error.filter(|e| !e.is_empty()) {
                        Some(error) => Err(ClientError::ServerClosed(error)),
                        None => {
                            info!("service closed the connection");
                            Ok(())
                        }
                    };
                }
                kind @ (MessageKind::StreamItem
                | MessageKind::Completion
                | MessageKind::StreamInvocation
                | MessageKind::CancelInvocation) => {
                    return Err(ProtocolError::UnhandledMessageType(kind).into());
                }
                MessageKind::Unknown(code) => debug!(code, "ignoring unknown message type"),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
