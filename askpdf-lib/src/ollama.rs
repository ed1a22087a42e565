//! Ollama HTTP API client
//!
//! Covers the two endpoints the pipeline needs:
//! - `POST /api/embed` for batched embeddings
//! - `POST /api/generate` for non-streaming completions

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Request timeout; generation on CPU can be slow
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Failures talking to the Ollama daemon
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to send request to {url}: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("HTTP {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("failed to parse response from {url}: {source}")]
    Parse { url: String, source: reqwest::Error },

    #[error("expected {expected} embeddings, got {actual}")]
    EmbeddingCount { expected: usize, actual: usize },
}

/// Thin client over the Ollama REST API
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client for the Ollama daemon at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, OllamaError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(OllamaError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Embed `input` with `model`, one vector per input in order.
    pub async fn embed(&self, model: &str, input: &[&str]) -> Result<Vec<Vec<f32>>, OllamaError> {
        let request = EmbedRequest { model, input };
        let response: EmbedResponse = self.post("/api/embed", &request).await?;

        if response.embeddings.len() != input.len() {
            return Err(OllamaError::EmbeddingCount {
                expected: input.len(),
                actual: response.embeddings.len(),
            });
        }
        Ok(response.embeddings)
    }

    /// Generate a completion for `prompt` without streaming.
    pub async fn generate(&self, model: &str, prompt: &str, temperature: f32) -> Result<String, OllamaError> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };
        let response: GenerateResponse = self.post("/api/generate", &request).await?;
        Ok(response.response)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, OllamaError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "ollama request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| OllamaError::Request { url: url.clone(), source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(OllamaError::Api { status, body });
        }

        response
            .json()
            .await
            .map_err(|source| OllamaError::Parse { url, source })
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "deepseek-r1:8b",
            prompt: "hi",
            stream: false,
            options: GenerateOptions { temperature: 0.5 },
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "deepseek-r1:8b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.5);
    }

    #[test]
    fn test_embed_response_parses() {
        let parsed: EmbedResponse =
            serde_json::from_str(r#"{"model":"m","embeddings":[[0.1,0.2],[0.3,0.4]]}"#).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_error() {
        // port 9 (discard) is closed on test machines
        let client = OllamaClient::new("http://127.0.0.1:9").unwrap();
        let err = client.embed("m", &["x"]).await.unwrap_err();
        assert!(matches!(err, OllamaError::Request { url, .. } if url.ends_with("/api/embed")));
    }
}
