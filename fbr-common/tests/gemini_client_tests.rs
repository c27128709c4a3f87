//! Gemini client tests against a local mock server

use fbr_common::config::GenAiSettings;
use fbr_common::genai::{GeminiClient, GenerationError, TextGenerator};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/gemini-2.0-flash-lite:generateContent";

fn client_for(server: &MockServer) -> GeminiClient {
    let settings = GenAiSettings {
        base_url: format!("{}/v1beta", server.uri()),
        requests_per_minute: 600,
        request_timeout_ms: 2_000,
        ..Default::default()
    };
    GeminiClient::new("test-key".to_string(), &settings).unwrap()
}

#[tokio::test]
async fn test_generate_returns_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "classify this" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Feature Request\n" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server).generate("classify this").await.unwrap();
    assert_eq!(text, "Feature Request\n");
}

#[tokio::test]
async fn test_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
        .mount(&server)
        .await;

    let result = client_for(&server).generate("hi").await;
    assert!(matches!(result, Err(GenerationError::RateLimited(_))));
}

#[tokio::test]
async fn test_503_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client_for(&server).generate("hi").await;
    assert!(matches!(result, Err(GenerationError::Transient(_))));
}

#[tokio::test]
async fn test_malformed_body_is_other() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client_for(&server).generate("hi").await;
    assert!(matches!(result, Err(GenerationError::Other(_))));
}
