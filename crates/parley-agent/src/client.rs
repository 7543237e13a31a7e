//! Chat completions client for OpenAI-compatible APIs.
//!
//! OpenAI and OpenRouter share the same wire format; they differ only in
//! endpoint and a couple of attribution headers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use crate::reasoner::{Reasoner, ReasoningRequest};

/// OpenAI chat completions endpoint.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenRouter chat completions endpoint.
pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    provider: &'static str,
    config: ModelConfig,
}

impl ChatCompletionsClient {
    /// Client for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, config: ModelConfig) -> Self {
        Self::with_endpoint("openai", OPENAI_API_URL, api_key, config)
    }

    /// Client for the OpenRouter API.
    pub fn openrouter(api_key: impl Into<String>, config: ModelConfig) -> Self {
        Self::with_endpoint("openrouter", OPENROUTER_API_URL, api_key, config)
    }

    /// Client for any compatible endpoint.
    pub fn with_endpoint(
        provider: &'static str,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        config: ModelConfig,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            provider,
            config,
        }
    }

    /// Model configuration in use.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Builds the request body for a single-prompt completion.
    pub fn build_request(&self, request: &ReasoningRequest) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(&request.prompt)],
            max_tokens: Some(self.config.token_budget(request.max_tokens)),
            temperature: Some(request.temperature.unwrap_or(self.config.temperature)),
        }
    }

    /// Send a chat completion request.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        trace!("Sending chat request: {:?}", request);

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if self.provider == "openrouter" {
            builder = builder.header("X-Title", "Parley");
        }

        let response = builder
            .json(request)
            .send()
            .await
            .map_err(|e| AgentError::Service(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Service(format!(
                "{} API error {}: {}",
                self.provider, status, text
            )));
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::MalformedDecision(format!("Failed to parse response: {}", e)))?;

        debug!(
            provider = self.provider,
            tokens = response.usage.as_ref().map_or(0, |u| u.total_tokens),
            "chat response received"
        );

        Ok(response)
    }
}

#[async_trait]
impl Reasoner for ChatCompletionsClient {
    fn provider(&self) -> &str {
        self.provider
    }

    async fn invoke(&self, request: &ReasoningRequest) -> Result<String> {
        let response = self.chat(&self.build_request(request)).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| AgentError::MalformedDecision("response has no content".into()))
    }
}

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,

    /// Conversation messages.
    pub messages: Vec<ChatMessage>,

    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A message in the chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: String,

    /// Text content of the message.
    pub content: Option<String>,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

/// Chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Completion choices.
    pub choices: Vec<ChatChoice>,

    /// Token usage information.
    pub usage: Option<ChatUsage>,
}

impl ChatResponse {
    /// Trimmed text of the first choice, if non-empty.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// A choice in the completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The message for this choice.
    pub message: ChatMessage,

    /// Finish reason (stop, length, etc.).
    pub finish_reason: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage {
    /// Total tokens used.
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoner::Phase;

    #[test]
    fn test_build_request_caps_tokens() {
        let client = ChatCompletionsClient::openai("key", ModelConfig::new("gpt-3.5-turbo"));
        let request = ReasoningRequest::new("writer", Phase::Processing, "Write.")
            .with_max_tokens(5000)
            .with_temperature(0.1);

        let body = client.build_request(&request);
        assert_eq!(body.model, "gpt-3.5-turbo");
        assert_eq!(body.max_tokens, Some(500));
        assert_eq!(body.temperature, Some(0.1));
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
    }

    #[test]
    fn test_request_serialization() {
        let client = ChatCompletionsClient::openrouter("key", ModelConfig::new("openai/gpt-4o-mini"));
        let body = client.build_request(&ReasoningRequest::new("critic", Phase::Decision, "Hi"));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "openai/gpt-4o-mini");
        assert_eq!(json["messages"][0]["content"], "Hi");
        assert_eq!(json["max_tokens"], 500);
        assert_eq!(client.provider(), "openrouter");
    }

    #[test]
    fn test_response_text() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "  YES - asked for a draft \n"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("YES - asked for a draft"));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_response_without_content() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.text().is_none());

        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.text().is_none());
    }
}
