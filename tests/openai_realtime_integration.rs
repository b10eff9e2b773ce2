//! Integration tests for the OpenAI Realtime upstream
//!
//! These tests verify:
//! - Session bootstrap request shape and response handling
//! - Bootstrap failure modes (status, timeout, unusable body)
//! - Stream connection with the ephemeral credential

mod mock_providers;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mock_providers::MockRealtimeServer;
use waav_call_relay::core::realtime::{
    EphemeralCredential, RealtimeConfig, RealtimeConnector, RealtimeError, SessionBootstrapper,
};

fn config(session_url: String, realtime_url: String) -> RealtimeConfig {
    RealtimeConfig {
        api_key: "sk-integration".to_string(),
        model: "gpt-4o-realtime-preview".to_string(),
        voice: "shimmer".to_string(),
        session_url,
        realtime_url,
        bootstrap_timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_secs(2),
    }
}

fn bootstrapper(server: &MockServer) -> SessionBootstrapper {
    SessionBootstrapper::new(
        reqwest::Client::new(),
        config(
            format!("{}/v1/realtime/sessions", server.uri()),
            "wss://unused.example.com/v1/realtime".to_string(),
        ),
    )
}

#[tokio::test]
async fn test_bootstrap_returns_ephemeral_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/realtime/sessions"))
        .and(header("authorization", "Bearer sk-integration"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"model": "gpt-4o-realtime-preview", "voice": "shimmer"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sess_abc",
            "object": "realtime.session",
            "model": "gpt-4o-realtime-preview",
            "client_secret": {"value": "ek_abc", "expires_at": 1_900_000_000}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = bootstrapper(&server).create_session().await.unwrap();
    assert_eq!(credential.secret(), "ek_abc");
    assert_eq!(credential.expires_at(), Some(1_900_000_000));
}

#[tokio::test]
async fn test_bootstrap_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    match bootstrapper(&server).create_session().await {
        Err(RealtimeError::BootstrapRejected { status, body }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected BootstrapRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bootstrap_missing_client_secret() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "sess_abc"})))
        .mount(&server)
        .await;

    assert!(matches!(
        bootstrapper(&server).create_session().await,
        Err(RealtimeError::SerializationError(_))
    ));
}

#[tokio::test]
async fn test_bootstrap_empty_client_secret() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"client_secret": {"value": ""}})),
        )
        .mount(&server)
        .await;

    assert!(matches!(
        bootstrapper(&server).create_session().await,
        Err(RealtimeError::AuthenticationFailed(_))
    ));
}

#[tokio::test]
async fn test_bootstrap_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"client_secret": {"value": "ek_late"}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    assert!(matches!(
        bootstrapper(&server).create_session().await,
        Err(RealtimeError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_bootstrap_without_api_key_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut cfg = config(
        format!("{}/v1/realtime/sessions", server.uri()),
        "wss://unused.example.com".to_string(),
    );
    cfg.api_key = String::new();

    let result = SessionBootstrapper::new(reqwest::Client::new(), cfg)
        .create_session()
        .await;
    assert!(matches!(result, Err(RealtimeError::AuthenticationFailed(_))));
}

#[tokio::test]
async fn test_connector_sends_credential_and_model() {
    let mut upstream = MockRealtimeServer::start().await;
    let connector = RealtimeConnector::new(config(
        "https://unused.example.com".to_string(),
        upstream.url.clone(),
    ));

    let credential = EphemeralCredential::new("ek_stream", None);
    let _stream = connector.connect(&credential).await.unwrap();

    let connection = upstream.next_connection().await;
    assert_eq!(connection.authorization.as_deref(), Some("Bearer ek_stream"));
    assert_eq!(
        connection.uri,
        "/v1/realtime?model=gpt-4o-realtime-preview"
    );
}

#[tokio::test]
async fn test_connector_rejects_http_endpoint_refusal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let ws_url = server.uri().replacen("http://", "ws://", 1);
    let connector = RealtimeConnector::new(config(
        "https://unused.example.com".to_string(),
        format!("{ws_url}/v1/realtime"),
    ));

    let result = connector
        .connect(&EphemeralCredential::new("ek_revoked", None))
        .await;
    assert!(matches!(result, Err(RealtimeError::AuthenticationFailed(_))));
}
