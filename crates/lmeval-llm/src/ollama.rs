//! Ollama `/api/generate` integration.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lmeval_core::config::{DEFAULT_INFERENCE_URL, DEFAULT_TIMEOUT_SECS, EvalConfig};
use lmeval_core::error::ModelError;
use lmeval_core::model::ModelClient;

use crate::retry::with_retry;

// ---------------------------------------------------------------------------
// Ollama generate API request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaError {
    pub error: String,
}

// ---------------------------------------------------------------------------
// OllamaClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INFERENCE_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: 0,
        }
    }
}

impl OllamaConfig {
    pub fn from_eval_config(config: &EvalConfig) -> Self {
        Self {
            base_url: config.inference_url.clone(),
            timeout: config.timeout(),
            retries: config.retries,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Blocking-per-call client for a local Ollama daemon.
pub struct OllamaClient {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    async fn generate_once(&self, model: &str, prompt: &str) -> Result<String, ModelError> {
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        tracing::debug!(model, url = %self.generate_url(), "sending generate request");
        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read response body".into());
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await.map_err(|e| self.map_transport_error(e))?;
        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| ModelError::InvalidResponse(format!("{e}: {}", truncate(&text, 200))))?;

        if let Some(tokens) = parsed.eval_count {
            tracing::debug!(model, tokens, "completion received");
        }
        Ok(parsed.response)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ModelError {
        if e.is_timeout() {
            ModelError::Timeout(format!(
                "no response from {} within {}s",
                self.config.base_url,
                self.config.timeout.as_secs()
            ))
        } else {
            ModelError::Unreachable(format!("{}: {e}", self.config.base_url))
        }
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ModelError> {
        if prompt.trim().is_empty() {
            return Err(ModelError::InvalidInput("prompt must not be empty".into()));
        }
        with_retry(self.config.retries, ModelError::is_transient, || {
            self.generate_once(model, prompt)
        })
        .await
    }

    fn provider(&self) -> &str {
        "ollama"
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let req = GenerateRequest {
            model: "llama3.2:latest",
            prompt: "What is 2+2?",
            stream: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "llama3.2:latest", "prompt": "What is 2+2?", "stream": false})
        );
    }

    #[test]
    fn response_deserialization_ignores_extra_fields() {
        let resp: GenerateResponse = serde_json::from_str(
            r#"{"model":"m","created_at":"2024-01-01T00:00:00Z","response":"4","done":true,"eval_count":3}"#,
        )
        .unwrap();
        assert_eq!(resp.response, "4");
        assert!(resp.done);
        assert_eq!(resp.eval_count, Some(3));
    }

    #[test]
    fn config_from_eval_config() {
        let eval = EvalConfig::new()
            .with_inference_url("http://gpu:11434")
            .with_timeout_secs(7)
            .with_retries(2);
        let config = OllamaConfig::from_eval_config(&eval);
        assert_eq!(config.base_url, "http://gpu:11434");
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.retries, 2);
    }

    #[test]
    fn generate_url_trims_trailing_slash() {
        let client =
            OllamaClient::new(OllamaConfig::default().with_base_url("http://localhost:11434/"))
                .unwrap();
        assert_eq!(client.generate_url(), "http://localhost:11434/api/generate");
        assert_eq!(client.provider(), "ollama");
    }

    #[tokio::test]
    async fn empty_prompt_rejected_without_network() {
        let client =
            OllamaClient::new(OllamaConfig::default().with_base_url("http://127.0.0.1:1")).unwrap();
        let err = client.complete("m", "   ").await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput(_)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
