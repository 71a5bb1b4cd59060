//! WebSocket transport over `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use signalr_core::TransportError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use super::{DuplexChannel, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens `ws://` and `wss://` channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, uri: &str, bearer: &str) -> Result<Box<dyn DuplexChannel>, TransportError> {
        let open_err = |reason: String| TransportError::Open {
            uri: uri.to_string(),
            reason,
        };

        let mut request = uri
            .into_client_request()
            .map_err(|e| open_err(e.to_string()))?;
        let auth = HeaderValue::from_str(&format!("Bearer {bearer}"))
            .map_err(|e| open_err(format!("authorization header: {e}")))?;
        let _ = request.headers_mut().insert(AUTHORIZATION, auth);

        let (ws, response) = connect_async(request)
            .await
            .map_err(|e| open_err(format!("WebSocket connect: {e}")))?;
        debug!(status = response.status().as_u16(), "websocket upgraded");

        Ok(Box::new(WebSocketChannel { ws }))
    }
}

struct WebSocketChannel {
    ws: WsStream,
}

#[async_trait]
impl DuplexChannel for WebSocketChannel {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(msg) = self.ws.next().await {
            match msg {
                Ok(Message::Text(text)) => return Ok(Some(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => {
                    let text = String::from_utf8(bytes.to_vec())
                        .map_err(|e| TransportError::Read(format!("binary frame is not UTF-8: {e}")))?;
                    return Ok(Some(text));
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "websocket close frame");
                    return Ok(None);
                }
                // tungstenite answers pings itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return Ok(None),
                Err(e) => return Err(TransportError::Read(e.to_string())),
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.ws.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Write(e.to_string())),
        }
    }
}
