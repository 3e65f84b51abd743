//! Integration tests for OllamaClient.
//!
//! Uses wiremock for HTTP mocking. Live tests against a real daemon are
//! `#[ignore]`d and need `OLLAMA_BASE_URI` plus `OLLAMA_TEST_MODEL`.

use std::time::Duration;

use lmeval_core::error::ModelError;
use lmeval_core::model::ModelClient;
use lmeval_llm::{OllamaClient, OllamaConfig};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::new(
        OllamaConfig::default()
            .with_base_url(server.uri())
            .with_timeout(Duration::from_secs(2)),
    )
    .expect("failed to build client")
}

#[tokio::test]
async fn complete_returns_response_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({
            "model": "llama3.2:latest",
            "prompt": "What is 2+2+2?",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2:latest",
            "response": "  6\n",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let text = client
        .complete("llama3.2:latest", "What is 2+2+2?")
        .await
        .expect("complete failed");

    // Returned unmodified, whitespace included.
    assert_eq!(text, "  6\n");
}

#[tokio::test]
async fn unknown_model_maps_to_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "model 'nope' not found, try pulling it first"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).complete("nope", "hi").await.unwrap_err();
    match err {
        ModelError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "model 'nope' not found, try pulling it first");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_is_kept_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .mount(&server)
        .await;

    let err = client_for(&server).complete("m", "hi").await.unwrap_err();
    assert!(matches!(
        err,
        ModelError::Status { status: 500, ref message } if message == "internal failure"
    ));
}

#[tokio::test]
async fn missing_response_field_is_invalid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
        .mount(&server)
        .await;

    let err = client_for(&server).complete("m", "hi").await.unwrap_err();
    assert!(matches!(err, ModelError::InvalidResponse(_)));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(
        OllamaConfig::default()
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let err = client.complete("m", "hi").await.unwrap_err();
    assert!(matches!(err, ModelError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_endpoint() {
    // Port 1 is reserved and refuses connections.
    let client = OllamaClient::new(
        OllamaConfig::default()
            .with_base_url("http://127.0.0.1:1")
            .with_timeout(Duration::from_secs(2)),
    )
    .unwrap();

    let err = client.complete("m", "hi").await.unwrap_err();
    assert!(
        matches!(err, ModelError::Unreachable(_) | ModelError::Timeout(_)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn transient_failures_are_retried_when_enabled() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "loading"})))
        .expect(3)
        .mount(&server)
        .await;

    let client = OllamaClient::new(
        OllamaConfig::default()
            .with_base_url(server.uri())
            .with_retries(2),
    )
    .unwrap();

    let err = client.complete("m", "hi").await.unwrap_err();
    assert!(matches!(err, ModelError::Status { status: 503, .. }));
    // Expectation of exactly 3 calls is verified when `server` drops.
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(
        OllamaConfig::default()
            .with_base_url(server.uri())
            .with_retries(3),
    )
    .unwrap();

    assert!(client.complete("m", "hi").await.is_err());
}

#[tokio::test]
#[ignore]
async fn live_ollama_completion() {
    let base = std::env::var("OLLAMA_BASE_URI").unwrap_or_else(|_| "http://localhost:11434".into());
    let model = std::env::var("OLLAMA_TEST_MODEL").expect("OLLAMA_TEST_MODEL required");
    let client = OllamaClient::new(OllamaConfig::default().with_base_url(base)).unwrap();
    let text = client
        .complete(&model, "Say 'hello' and nothing else")
        .await
        .unwrap();
    assert!(!text.is_empty());
}
