//! In-process transport backed by tokio channels.
//!
//! [`MemoryTransport::pair`] returns the client side and a [`MemoryPeer`]
//! that plays the service: it sees every frame the client writes and can
//! push frames back or hang up.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use signalr_core::TransportError;
use tokio::sync::mpsc;

use super::{DuplexChannel, Transport};

/// One call to [`Transport::open`], as seen by the memory transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    /// Requested URI.
    pub uri: String,
    /// Bearer token presented.
    pub bearer: String,
}

/// Transport that hands out a single pre-wired channel.
#[derive(Debug)]
pub struct MemoryTransport {
    channel: Mutex<Option<MemoryChannel>>,
    opened: Mutex<Vec<OpenRequest>>,
}

impl MemoryTransport {
    /// A transport and the peer on the other end of its only channel.
    pub fn pair() -> (Self, MemoryPeer) {
        let (to_peer, from_client) = mpsc::unbounded_channel();
        let (to_client, from_peer) = mpsc::unbounded_channel();
        let transport = Self {
            channel: Mutex::new(Some(MemoryChannel {
                tx: Some(to_peer),
                rx: from_peer,
            })),
            opened: Mutex::new(Vec::new()),
        };
        let peer = MemoryPeer {
            tx: Some(to_client),
            rx: from_client,
        };
        (transport, peer)
    }

    /// Every open attempt so far, in order.
    pub fn opened(&self) -> Vec<OpenRequest> {
        lock(&self.opened).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, uri: &str, bearer: &str) -> Result<Box<dyn DuplexChannel>, TransportError> {
        lock(&self.opened).push(OpenRequest {
            uri: uri.to_string(),
            bearer: bearer.to_string(),
        });
        let channel = lock(&self.channel).take().ok_or_else(|| TransportError::Open {
            uri: uri.to_string(),
            reason: "memory channel already taken".to_string(),
        })?;
        Ok(Box::new(channel))
    }
}

#[derive(Debug)]
struct MemoryChannel {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl DuplexChannel for MemoryChannel {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(text)
            .map_err(|_| TransportError::Write("peer dropped".to_string()))
    }

    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        drop(self.tx.take());
        self.rx.close();
        Ok(())
    }
}

/// The service side of a memory channel.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Push a raw text message to the client.
    ///
    /// Returns `false` once the client has closed its side.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.send(text.into()).is_ok())
    }

    /// Next message the client wrote. `None` after the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Stop sending. The client sees the channel as closed by the peer.
    pub fn hang_up(&mut self) {
        drop(self.tx.take());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let (transport, mut peer) = MemoryTransport::pair();
        let mut channel = transport.open("ws://x/client/?hub=h", "tok").await.unwrap();

        channel.send_text("hello".into()).await.unwrap();
        assert_eq!(peer.recv().await.as_deref(), Some("hello"));

        assert!(peer.send("world"));
        assert_eq!(channel.recv_text().await.unwrap().as_deref(), Some("world"));
    }

    #[tokio::test]
    async fn records_open_requests() {
        let (transport, _peer) = MemoryTransport::pair();
        let _channel = transport.open("ws://x/a", "t1").await.unwrap();
        assert_eq!(
            transport.opened(),
            vec![OpenRequest {
                uri: "ws://x/a".into(),
                bearer: "t1".into(),
            }]
        );
    }

    #[tokio::test]
    async fn second_open_fails() {
        let (transport, _peer) = MemoryTransport::pair();
        let _channel = transport.open("ws://x/a", "t").await.unwrap();
        let second = transport.open("ws://x/a", "t").await;
        assert_matches!(second.err(), Some(TransportError::Open { .. }));
        assert_eq!(transport.opened().len(), 2);
    }

    #[tokio::test]
    async fn hang_up_reads_as_closed() {
        let (transport, mut peer) = MemoryTransport::pair();
        let mut channel = transport.open("ws://x/a", "t").await.unwrap();
        peer.hang_up();
        assert_eq!(channel.recv_text().await.unwrap(), None);
    }

    #[tokio::test]
    async fn client_close_is_seen_by_peer() {
        let (transport, mut peer) = MemoryTransport::pair();
        let mut channel = transport.open("ws://x/a", "t").await.unwrap();
        channel.close().await.unwrap();
        channel.close().await.unwrap();
        assert_eq!(peer.recv().await, None);
        assert!(!peer.send("late"));
    }
}
