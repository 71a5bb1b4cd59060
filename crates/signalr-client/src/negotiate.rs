//! Negotiation: asking the service for a connection id.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use signalr_core::SendFailure;
use signalr_core::constants::WEBSOCKETS_TRANSPORT;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::errors::{NegotiationError, Result};

/// A transport offered by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTransport {
    /// Transport name, e.g. `WebSockets`.
    #[serde(rename = "transport", default)]
    pub name: String,
    /// Supported formats, e.g. `Text`.
    #[serde(rename = "transportFormats", default)]
    pub formats: Vec<String>,
}

/// Connection info returned by the negotiate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationResult {
    /// Id to present when opening the channel.
    #[serde(default)]
    pub connection_id: String,
    /// Transports the service will accept.
    #[serde(default)]
    pub available_transports: Vec<AvailableTransport>,
}

impl NegotiationResult {
    /// Whether `name` is among the offered transports.
    pub fn supports(&self, name: &str) -> bool {
        self.available_transports.iter().any(|t| t.name == name)
    }
}

impl Client {
    /// Negotiate with the service, at most once per client.
    ///
    /// Concurrent callers share a single request. A failed negotiation is not
    /// cached, so the next caller tries again.
    #[tracing::instrument(skip_all, fields(hub = %self.hub))]
    pub async fn negotiate_once(&self) -> Result<Arc<NegotiationResult>> {
        if let Some(cached) = self.negotiation.read().await.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let mut slot = self.negotiation.write().await;
        if let Some(cached) = slot.as_ref() {
            debug!("negotiation completed by a concurrent caller");
            return Ok(Arc::clone(cached));
        }

        let result = self.negotiate().await?;
        if !result.supports(WEBSOCKETS_TRANSPORT) {
            warn!(
                transports = ?result.available_transports,
                "service does not offer WebSockets"
            );
            return Err(NegotiationError::TransportNotSupported.into());
        }

        info!(connection_id = %result.connection_id, "negotiated connection");
        let result = Arc::new(result);
        *slot = Some(Arc::clone(&result));
        Ok(result)
    }

    async fn negotiate(&self) -> Result<NegotiationResult> {
        let uri = self.negotiate_uri()?;
        let token = self.minter.mint(&self.channel_audience(), self.token_ttl)?;

        let response = self
            .http
            .post(uri.as_str())
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if status > 399 {
            metrics::counter!("signalr_negotiate_total", "status" => "failure").increment(1);
            warn!(status, uri = %uri, "negotiation rejected");
            return Err(NegotiationError::Rejected(SendFailure {
                status_code: status,
                body,
            })
            .into());
        }

        metrics::counter!("signalr_negotiate_total", "status" => "success").increment(1);
        Ok(serde_json::from_str(&body).map_err(NegotiationError::Decode)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
