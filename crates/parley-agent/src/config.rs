//! Model configuration for reasoning clients.

use parley_core::ProviderSettings;

/// Model parameters used by a reasoning client.
///
/// Per-request `max_tokens` and `temperature` win; these values cap the
/// token budget and fill in when a request leaves them unset.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Model identifier (e.g. "gpt-3.5-turbo", "openai/gpt-4o-mini").
    pub model: String,

    /// Upper bound on tokens to generate.
    pub max_tokens: u32,

    /// Default temperature (0.0 to 2.0).
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

impl ModelConfig {
    /// Creates a configuration for the given model with default limits.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Builds a configuration from provider settings.
    pub fn from_provider(settings: &ProviderSettings) -> Self {
        Self {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature.clamp(0.0, 2.0),
        }
    }

    /// Set the maximum tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Token budget for a request, capped by `max_tokens`.
    pub fn token_budget(&self, requested: Option<u32>) -> u32 {
        requested.map_or(self.max_tokens, |n| n.min(self.max_tokens))
    }
}
