//! Negotiation and REST senders against a mock service.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::json;
use signalr_client::{Client, ClientError, Envelope, NegotiationError};
use signalr_core::SendFailure;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const KEY: &str = "http-test-key";

fn client(server: &MockServer) -> Client {
    let conn = format!("Endpoint={};AccessKey={KEY};", server.uri());
    Client::builder(&conn, "Chat")
        .unwrap()
        .name("sender")
        .build()
        .unwrap()
}

fn negotiate_body() -> serde_json::Value {
    json!({
        "connectionId": "abc",
        "availableTransports": [{"transport": "WebSockets", "transportFormats": ["Text"]}]
    })
}

/// Audience of the bearer token on `request`, verified with the test key.
fn token_audience(request: &Request, expected: &str) -> serde_json::Value {
    let auth = request
        .headers
        .get("authorization")
        .expect("authorization header")
        .to_str()
        .unwrap();
    let token = auth.strip_prefix("Bearer ").expect("bearer scheme");
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[expected]);
    jsonwebtoken::decode::<serde_json::Value>(
        token,
        &DecodingKey::from_secret(KEY.as_bytes()),
        &validation,
    )
    .unwrap()
    .claims
}

// ─────────────────────────────────────────────────────────────────────────────
// Negotiation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_negotiation_issues_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/client/negotiate"))
        .and(query_param("hub", "Chat"))
        .and(header("content-type", "application/json"))
        .and(header_exists("authorization"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(negotiate_body())
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(client(&server));
    let calls = (0..8).map(|_| {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.negotiate_once().await })
    });
    let results = futures::future::join_all(calls).await;

    for result in results {
        let negotiated = result.unwrap().unwrap();
        assert_eq!(negotiated.connection_id, "abc");
    }
    let again = client.negotiate_once().await.unwrap();
    assert_eq!(again.connection_id, "abc");
    server.verify().await;
}

#[tokio::test]
async fn negotiate_token_targets_channel_audience() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/client/negotiate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(negotiate_body()))
        .mount(&server)
        .await;

    let client = client(&server);
    let _ = client.negotiate_once().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let claims = token_audience(&requests[0], &client.channel_audience());
    assert_eq!(claims["nameid"], "sender");
}

#[tokio::test]
async fn rejected_negotiation_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/client/negotiate"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.negotiate_once().await.unwrap_err();
    assert_matches!(
        err,
        ClientError::Negotiation(NegotiationError::Rejected(SendFailure { status_code: 401, ref body })) if body == "unauthorized"
    );

    // failures are not cached
    assert!(client.negotiate_once().await.is_err());
    server.verify().await;
}

#[tokio::test]
async fn malformed_negotiation_response_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/client/negotiate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client(&server).negotiate_once().await.unwrap_err();
    assert_matches!(err, ClientError::Negotiation(NegotiationError::Decode(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Senders
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn broadcast_posts_envelope_with_uri_scoped_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/hubs/chat"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"type": 1, "target": "foo", "arguments": ["bar", 2]})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let msg = Envelope::invocation("foo").arg("bar").unwrap().arg(&2).unwrap();
    client.broadcast_all(&msg).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let claims = token_audience(&requests[0], &client.rest_base());
    assert_eq!(claims["aud"], format!("{}/api/v1/hubs/chat", server.uri()));
}

#[tokio::test]
async fn not_found_is_send_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = client(&server)
        .send_to_user(&Envelope::invocation("foo"), "bob")
        .await
        .unwrap_err();

    assert_matches!(
        &err,
        ClientError::Send(failure) if *failure == SendFailure { status_code: 404, body: "not found".into() }
    );
    assert_eq!(
        err.to_string(),
        "failed to send message with status code 404 and body: \"not found\""
    );
}

#[tokio::test]
async fn targeted_sends_hit_their_paths() {
    let server = MockServer::start().await;
    for p in [
        "/api/v1/hubs/chat/groups/room%201",
        "/api/v1/hubs/chat/groups/a,b",
        "/api/v1/hubs/chat/users/bob",
        "/api/v1/hubs/chat/users/bob,eve",
    ] {
        Mock::given(method("POST"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client(&server);
    let msg = Envelope::invocation("hello");
    client.broadcast_group(&msg, "room 1").await.unwrap();
    client.broadcast_groups(&msg, &["a", "b"]).await.unwrap();
    client.send_to_user(&msg, "bob").await.unwrap();
    client.send_to_users(&msg, &["bob", "eve"]).await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn group_membership_methods() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/hubs/chat/groups/admins/users/bob"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/hubs/chat/groups/admins/users/bob"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/hubs/chat/users/bob/groups"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.add_user_to_group("admins", "bob").await.unwrap();
    client.remove_user_from_group("admins", "bob").await.unwrap();
    client.remove_user_from_all_groups("bob").await.unwrap();
    server.verify().await;

    let requests = server.received_requests().await.unwrap();
    let membership = format!("{}/api/v1/hubs/chat/groups/admins/users/bob", server.uri());
    let _ = token_audience(&requests[0], &membership);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn send_invocation_uses_caller_uri() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/custom/route"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let uri = format!("{}/custom/route", server.uri());
    client
        .send_invocation(&uri, &Envelope::invocation("x"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let _ = token_audience(&requests[0], &uri);
}
