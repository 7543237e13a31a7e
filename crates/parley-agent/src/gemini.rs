//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use crate::reasoner::{Reasoner, ReasoningRequest};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Reasoning client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    config: ModelConfig,
}

impl GeminiClient {
    /// Creates a client against the public Gemini endpoint.
    pub fn new(api_key: impl Into<String>, config: ModelConfig) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, config)
    }

    /// Creates a client against a custom base URL.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        config: ModelConfig,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Builds the JSON request body for a single prompt.
    pub fn build_request_body(&self, request: &ReasoningRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": request.prompt}]
            }],
            "generationConfig": {
                "maxOutputTokens": self.config.token_budget(request.max_tokens),
                "temperature": request.temperature.unwrap_or(self.config.temperature)
            }
        })
    }

    /// Extracts the concatenated, trimmed text parts of the first candidate.
    pub fn parse_response(body: &Value) -> Result<String> {
        let parts = body
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| {
                AgentError::MalformedDecision("missing candidates[0].content.parts".to_string())
            })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();

        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::MalformedDecision("no text in response".to_string()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl Reasoner for GeminiClient {
    fn provider(&self) -> &str {
        "gemini"
    }

    async fn invoke(&self, request: &ReasoningRequest) -> Result<String> {
        let body = self.build_request_body(request);
        trace!("Sending generateContent request: {}", body);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Service(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let reason = match status {
                StatusCode::TOO_MANY_REQUESTS => "rate limited",
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "unauthorized",
                _ => "request failed",
            };
            return Err(AgentError::Service(format!(
                "gemini API error {} ({}): {}",
                status, reason, text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::MalformedDecision(format!("Failed to parse response: {}", e)))?;

        debug!(model = %self.config.model, "generateContent response received");
        Self::parse_response(&body)
    }
}
