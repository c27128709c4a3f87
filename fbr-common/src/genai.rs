//! Text generation service client
//!
//! [`TextGenerator`] is the seam the classifier and the profile generator
//! call through. [`GeminiClient`] implements it against the Gemini
//! `generateContent` REST endpoint with client-side pacing.

use crate::config::GenAiSettings;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use tracing::debug;

/// Text generation failures, split by how callers should back off
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Quota or rate limit exhausted (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Network failure, timeout or server-side error
    #[error("Transient error: {0}")]
    Transient(String),

    /// Anything else (bad request, unreadable response)
    #[error("Generation error: {0}")]
    Other(String),
}

/// Prompt-in, text-out generation service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

type DirectRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Gemini API client
pub struct GeminiClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
}

impl GeminiClient {
    pub fn new(api_key: String, settings: &GenAiSettings) -> Result<Self> {
        let per_minute = NonZeroU32::new(settings.requests_per_minute).ok_or_else(|| {
            Error::Config("genai.requests_per_minute must be at least 1".to_string())
        })?;
        let rate_limiter = governor::RateLimiter::direct(governor::Quota::per_minute(per_minute));

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            settings.base_url.trim_end_matches('/'),
            settings.model
        );

        Ok(Self {
            api_key,
            endpoint,
            client,
            rate_limiter,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        self.rate_limiter.until_ready().await;

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(endpoint = %self.endpoint, prompt_len = prompt.len(), "Querying Gemini API");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Other(format!("Failed to parse response: {}", e)))?;

        extract_text(parsed)
    }
}

fn classify_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        GenerationError::Transient(e.to_string())
    } else {
        GenerationError::Other(e.to_string())
    }
}

/// Map a non-success HTTP status onto an error kind
fn classify_status(status: StatusCode, body: String) -> GenerationError {
    let message = format!("HTTP {}: {}", status.as_u16(), body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        GenerationError::RateLimited(message)
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        GenerationError::Transient(message)
    } else {
        GenerationError::Other(message)
    }
}

/// Concatenated text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> std::result::Result<String, GenerationError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GenerationError::Other(
            "response contained no candidate text".to_string(),
        ));
    }

    Ok(text)
}
