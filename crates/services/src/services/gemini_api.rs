//! Gemini API client, the text-generation collaborator behind the AI gateway.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Error)]
pub enum GeminiApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("credential rejected: {0}")]
    InvalidCredential(String),
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing api key: GEMINI_API_KEY environment variable not set")]
    MissingApiKey,
}

impl GeminiApiError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// `Ok(None)` means the service answered but produced no text.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<Option<String>, GeminiApiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Response from generateContent
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate verbatim, `None` when it is empty.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiApiClient {
    http: Client,
    api_key: SecretString,
    api_base: String,
    max_retries: usize,
}

impl GeminiApiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
    const DEFAULT_RETRIES: usize = 2;

    pub fn new(api_key: SecretString, api_base: Option<String>) -> Result<Self, GeminiApiError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(GeminiApiError::MissingApiKey);
        }

        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("formula-operator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GeminiApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            api_base: api_base
                .unwrap_or_else(|| GEMINI_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_retries: Self::DEFAULT_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn send_request(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, GeminiApiError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, model);
        let res = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<GenerateContentResponse>()
                .await
                .map_err(|e| GeminiApiError::Serde(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(GeminiApiError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = res.text().await.unwrap_or_default();
                Err(GeminiApiError::InvalidCredential(body))
            }
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                if status == 400 && is_credential_rejection(&body) {
                    return Err(GeminiApiError::InvalidCredential(body));
                }
                Err(GeminiApiError::Http { status, body })
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiApiClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<Option<String>, GeminiApiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature },
        };

        let response = (|| async { self.send_request(model, &request).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_delay(Duration::from_secs(10))
                    .with_max_times(self.max_retries)
                    .with_jitter(),
            )
            .when(|e: &GeminiApiError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "Gemini API call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        Ok(response.text())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GeminiApiError {
    if e.is_timeout() {
        GeminiApiError::Timeout
    } else {
        GeminiApiError::Transport(e.to_string())
    }
}

/// Gemini answers a bad key or an unsupported region with a plain 400.
fn is_credential_rejection(body: &str) -> bool {
    body.contains("API_KEY_INVALID")
        || body.contains("API key not valid")
        || body.contains("location is not supported")
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    fn client(server: &MockServer) -> GeminiApiClient {
        GeminiApiClient::new(SecretString::from("test-key"), Some(server.base_url()))
            .unwrap()
            .with_max_retries(0)
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "=SUM(" }, { "text": "A1:A9)" }] }
            }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("=SUM(A1:A9)"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_whitespace_text_is_kept_verbatim() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "  \n" }] } }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("  \n"));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let err = GeminiApiClient::new(SecretString::from("  "), None).unwrap_err();
        assert!(matches!(err, GeminiApiError::MissingApiKey));
    }

    #[test]
    fn test_should_retry() {
        assert!(GeminiApiError::Timeout.should_retry());
        assert!(GeminiApiError::Http { status: 503, body: String::new() }.should_retry());
        assert!(!GeminiApiError::Http { status: 404, body: String::new() }.should_retry());
        assert!(!GeminiApiError::RateLimited.should_retry());
        assert!(!GeminiApiError::InvalidCredential(String::new()).should_retry());
    }

    #[tokio::test]
    async fn test_generate_hits_model_endpoint_with_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-3-flash-preview:generateContent")
                    .header("x-goog-api-key", "test-key");
                then.status(200).json_body(serde_json::json!({
                    "candidates": [{ "content": { "parts": [{ "text": "=VLOOKUP(A2,B:C,2,FALSE)" }] } }]
                }));
            })
            .await;

        let text = client(&server)
            .generate("gemini-3-flash-preview", "lookup", 0.2)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text.as_deref(), Some("=VLOOKUP(A2,B:C,2,FALSE)"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1beta/models/rate:generateContent");
                then.status(429).body("quota");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1beta/models/badkey:generateContent");
                then.status(400)
                    .body(r#"{"error":{"message":"API key not valid. Please pass a valid API key."}}"#);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1beta/models/down:generateContent");
                then.status(503).body("overloaded");
            })
            .await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1beta/models/unauth:generateContent");
                then.status(401).body("unauthenticated");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1beta/models/forbidden:generateContent");
                then.status(403).body("permission denied");
            })
            .await;

        let client = client(&server);
        assert!(matches!(
            client.generate("unauth", "p", 0.1).await,
            Err(GeminiApiError::InvalidCredential(body)) if body == "unauthenticated"
        ));
        assert!(matches!(
            client.generate("forbidden", "p", 0.1).await,
            Err(GeminiApiError::InvalidCredential(_))
        ));
        assert!(matches!(
            client.generate("rate", "p", 0.1).await,
            Err(GeminiApiError::RateLimited)
        ));
        assert!(matches!(
            client.generate("badkey", "p", 0.1).await,
            Err(GeminiApiError::InvalidCredential(_))
        ));
        assert!(matches!(
            client.generate("down", "p", 0.1).await,
            Err(GeminiApiError::Http { status: 503, .. })
        ));
    }
}
