//! Outbound REST calls: broadcasts, user and group invocations, and group
//! membership.
//!
//! Every call mints its own token scoped to the exact URI it targets. Calls
//! are not retried and not cancellable.

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use signalr_auth::rest_base;
use signalr_core::protocol::Envelope;
use signalr_core::{ProtocolError, SendFailure};
use tracing::{debug, warn};

use crate::client::{Client, encode_component};
use crate::errors::Result;

fn join_components(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| encode_component(v))
        .collect::<Vec<_>>()
        .join(",")
}

impl Client {
    /// `{endpoint}/api/v1/hubs/{hub}` with the hub lower-cased.
    pub fn rest_base(&self) -> String {
        rest_base(&self.endpoint, &self.hub)
    }

    /// Invoke `msg` on every connection of the hub.
    pub async fn broadcast_all(&self, msg: &Envelope) -> Result<()> {
        let uri = self.rest_base();
        self.execute("broadcast_all", Method::POST, &uri, Some(msg))
            .await
    }

    /// Invoke `msg` on every member of `group`.
    pub async fn broadcast_group(&self, msg: &Envelope, group: &str) -> Result<()> {
        let uri = format!("{}/groups/{}", self.rest_base(), encode_component(group));
        self.execute("broadcast_group", Method::POST, &uri, Some(msg))
            .await
    }

    /// Invoke `msg` on every member of any of `groups`.
    pub async fn broadcast_groups(&self, msg: &Envelope, groups: &[&str]) -> Result<()> {
        let uri = format!("{}/groups/{}", self.rest_base(), join_components(groups));
        self.execute("broadcast_groups", Method::POST, &uri, Some(msg))
            .await
    }

    /// Invoke `msg` on every connection of `user`.
    pub async fn send_to_user(&self, msg: &Envelope, user: &str) -> Result<()> {
        let uri = format!("{}/users/{}", self.rest_base(), encode_component(user));
        self.execute("send_to_user", Method::POST, &uri, Some(msg))
            .await
    }

    /// Invoke `msg` on every connection of each of `users`.
    pub async fn send_to_users(&self, msg: &Envelope, users: &[&str]) -> Result<()> {
        let uri = format!("{}/users/{}", self.rest_base(), join_components(users));
        self.execute("send_to_users", Method::POST, &uri, Some(msg))
            .await
    }

    /// Add `user` to `group`.
    pub async fn add_user_to_group(&self, group: &str, user: &str) -> Result<()> {
        let uri = self.membership_uri(group, user);
        self.execute("add_user_to_group", Method::PUT, &uri, None)
            .await
    }

    /// Remove `user` from `group`.
    pub async fn remove_user_from_group(&self, group: &str, user: &str) -> Result<()> {
        let uri = self.membership_uri(group, user);
        self.execute("remove_user_from_group", Method::DELETE, &uri, None)
            .await
    }

    /// Remove `user` from every group of the hub.
    pub async fn remove_user_from_all_groups(&self, user: &str) -> Result<()> {
        let uri = format!("{}/users/{}/groups", self.rest_base(), encode_component(user));
        self.execute("remove_user_from_all_groups", Method::DELETE, &uri, None)
            .await
    }

    /// POST `msg` to an arbitrary service URI.
    pub async fn send_invocation(&self, uri: &str, msg: &Envelope) -> Result<()> {
        self.execute("send_invocation", Method::POST, uri, Some(msg))
            .await
    }

    fn membership_uri(&self, group: &str, user: &str) -> String {
        format!(
            "{}/groups/{}/users/{}",
            self.rest_base(),
            encode_component(group),
            encode_component(user)
        )
    }

    #[tracing::instrument(skip(self, method, body), fields(method = %method))]
    async fn execute(
        &self,
        operation: &'static str,
        method: Method,
        uri: &str,
        body: Option<&Envelope>,
    ) -> Result<()> {
        let token = self.minter.mint(uri, self.token_ttl)?;
        let mut request = self
            .http
            .request(method, uri)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(msg) = body {
            let bytes = serde_json::to_vec(msg).map_err(ProtocolError::Encode)?;
            request = request.body(bytes);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if status > 399 {
            metrics::counter!("signalr_send_total", "operation" => operation, "status" => "failure")
                .increment(1);
            warn!(status, body = %body, "service rejected request");
            return Err(SendFailure {
                status_code: status,
                body,
            }
            .into());
        }

        metrics::counter!("signalr_send_total", "operation" => operation, "status" => "success")
            .increment(1);
        debug!(status, "request accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_components_are_encoded_individually() {
        assert_eq!(join_components(&["a b", "c,d", "e"]), "a%20b,c%2Cd,e");
    }

    #[test]
    fn membership_uri_shape() {
        let client = Client::new(
            "Endpoint=https://x.service.signalr.net;AccessKey=k;",
            "Chat",
        )
        .unwrap();
        assert_eq!(
            client.membership_uri("room 1", "bob"),
            "https://x.service.signalr.net/api/v1/hubs/chat/groups/room%201/users/bob"
        );
    }
}
