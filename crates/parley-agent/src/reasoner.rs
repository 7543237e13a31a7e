//! Reasoning service boundary.
//!
//! A [`Reasoner`] turns a prompt into text. It is the only place the crate
//! talks to a model; everything above it deals in [`ReasoningRequest`]s.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::{Provider, Settings};
use tracing::{info, warn};

use crate::client::ChatCompletionsClient;
use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use crate::gemini::GeminiClient;

/// Tracing target for prompts and responses.
///
/// The CLI routes this target to a dedicated file instead of the terminal.
pub const PROMPT_LOG_TARGET: &str = "parley::prompts";

/// Phase of a persona decision, recorded in the prompt log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Trigger question ("should you act?").
    Decision,
    /// Text generation.
    Processing,
}

impl Phase {
    fn label(&self) -> &'static str {
        match self {
            Self::Decision => "DECISION",
            Self::Processing => "PROCESSING",
        }
    }
}

/// A single prompt for the reasoning service.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    /// Agent issuing the request.
    pub agent: String,
    /// Decision phase.
    pub phase: Phase,
    /// Full prompt text.
    pub prompt: String,
    /// Token budget.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl ReasoningRequest {
    /// Creates a request with no sampling overrides.
    pub fn new(agent: impl Into<String>, phase: Phase, prompt: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            phase,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text-in, text-out reasoning capability.
///
/// Calls may be slow, may fail, and are not deterministic across calls.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Short provider name for logs.
    fn provider(&self) -> &str;

    /// Sends the prompt and returns the trimmed completion text.
    async fn invoke(&self, request: &ReasoningRequest) -> Result<String>;
}

/// Invokes the reasoner, recording prompt and response in the prompt log.
pub async fn invoke_logged(reasoner: &dyn Reasoner, request: &ReasoningRequest) -> Result<String> {
    let label = request.phase.label();
    info!(
        target: PROMPT_LOG_TARGET,
        "[{}] {} PROMPT:\n{}\n{}",
        request.agent,
        label,
        request.prompt,
        "=".repeat(50)
    );

    match reasoner.invoke(request).await {
        Ok(text) => {
            info!(
                target: PROMPT_LOG_TARGET,
                "[{}] {} RESPONSE: {}\n{}",
                request.agent,
                label,
                text,
                "=".repeat(50)
            );
            Ok(text)
        }
        Err(e) => {
            warn!(
                target: PROMPT_LOG_TARGET,
                "[{}] {} FAILED: {}",
                request.agent,
                label,
                e
            );
            Err(e)
        }
    }
}

/// Builds the reasoner for the provider the settings resolve to.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn Reasoner>> {
    let provider = settings.resolve_provider()?;
    if provider != settings.provider {
        warn!(
            selected = %settings.provider,
            using = %provider,
            "selected provider has no API key, falling back"
        );
    }

    let provider_settings = settings.provider_settings(provider);
    let api_key = provider_settings.api_key.clone().ok_or_else(|| {
        AgentError::Configuration(format!("Missing {} environment variable", provider.api_key_var()))
    })?;
    let config = ModelConfig::from_provider(provider_settings);

    let reasoner: Arc<dyn Reasoner> = match provider {
        Provider::OpenAi => Arc::new(ChatCompletionsClient::openai(api_key, config)),
        Provider::OpenRouter => Arc::new(ChatCompletionsClient::openrouter(api_key, config)),
        Provider::Gemini => Arc::new(GeminiClient::new(api_key, config)),
    };
    info!(provider = %provider, "reasoning client ready");
    Ok(reasoner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned()).unwrap()
    }

    #[test]
    fn test_request_builder() {
        let request = ReasoningRequest::new("writer", Phase::Decision, "Should you act?")
            .with_max_tokens(50)
            .with_temperature(0.1);
        assert_eq!(request.agent, "writer");
        assert_eq!(request.max_tokens, Some(50));
        assert_eq!(request.temperature, Some(0.1));
    }

    #[test]
    fn test_from_settings_selects_provider() {
        let reasoner = from_settings(&settings(&[
            ("LLM_PROVIDER", "gemini"),
            ("GEMINI_API_KEY", "g-key"),
        ]))
        .unwrap();
        assert_eq!(reasoner.provider(), "gemini");
    }

    #[test]
    fn test_from_settings_falls_back() {
        let reasoner = from_settings(&settings(&[
            ("LLM_PROVIDER", "gemini"),
            ("OPENROUTER_API_KEY", "or-key"),
        ]))
        .unwrap();
        assert_eq!(reasoner.provider(), "openrouter");
    }

    #[test]
    fn test_from_settings_without_keys() {
        let err = from_settings(&settings(&[])).err().unwrap();
        assert!(matches!(err, AgentError::Configuration(_)));
    }
}
