//! Environment-driven configuration for Parley.
//!
//! All tunables are read from the process environment (optionally seeded from
//! `.env` files). Values fall back to defaults when unset.
//!
//! # Environment Variables
//!
//! - `LLM_PROVIDER`: `openai` (default), `openrouter` or `gemini`
//! - `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_MAX_TOKENS`, `OPENAI_TEMPERATURE`
//! - `OPENROUTER_API_KEY`, `OPENROUTER_MODEL`, `OPENROUTER_MAX_TOKENS`, `OPENROUTER_TEMPERATURE`
//! - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_MAX_TOKENS`, `GEMINI_TEMPERATURE`
//! - `CONTEXT_WINDOW`: default number of messages each agent sees
//! - `AGENT_WORD_LIMIT`: word budget stated in generation prompts
//! - `SYNTHESIS_QUORUM`: perspective posts required before a synthesis
//! - `AGENT_RATE_LIMIT_SECS`: minimum seconds between two posts of one agent (0 = off)
//! - `MODERATION_HISTORY`: recent posts per agent checked for duplicates (0 = off)
//! - `MODERATION_SIMILARITY`: word overlap in `(0, 1]` treated as a near-duplicate
//! - `REASONING_TIMEOUT_SECS`: per-call timeout for the reasoning service
//! - `COMPLETION_NOTES`: post persona completion notes (`true`/`false`)
//! - `PARLEY_LOG_DIR`: directory for the prompt log

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::{ConfigError, Result};

/// Environment variable selecting the reasoning provider.
pub const PROVIDER_ENV: &str = "LLM_PROVIDER";

/// Environment variable for the prompt log directory.
pub const LOG_DIR_ENV: &str = "PARLEY_LOG_DIR";

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_CONTEXT_WINDOW: usize = 5;
const DEFAULT_WORD_LIMIT: usize = 100;
const DEFAULT_QUORUM: usize = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MODERATION_HISTORY: usize = 5;
const DEFAULT_MODERATION_SIMILARITY: f64 = 0.9;
const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Reasoning service provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Provider {
    /// OpenAI chat completions.
    #[default]
    OpenAi,
    /// OpenRouter (OpenAI-compatible chat completions).
    OpenRouter,
    /// Google Gemini `generateContent`.
    Gemini,
}

impl Provider {
    /// All providers in fallback order.
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::OpenRouter, Provider::Gemini];

    /// Prefix used for this provider's environment variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI",
            Self::OpenRouter => "OPENROUTER",
            Self::Gemini => "GEMINI",
        }
    }

    /// Name of the API key variable.
    pub fn api_key_var(&self) -> String {
        format!("{}_API_KEY", self.env_prefix())
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-3.5-turbo",
            Self::OpenRouter => "openai/gpt-4o-mini",
            Self::Gemini => "gemini-1.5-flash",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::OpenRouter => write!(f, "openrouter"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Credentials and sampling defaults for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// API key, if configured.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Default maximum tokens per completion.
    pub max_tokens: u32,
    /// Default sampling temperature.
    pub temperature: f32,
}

impl ProviderSettings {
    /// Returns true if an API key is present.
    pub fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider selected by `LLM_PROVIDER`.
    pub provider: Provider,
    /// OpenAI settings.
    pub openai: ProviderSettings,
    /// OpenRouter settings.
    pub openrouter: ProviderSettings,
    /// Gemini settings.
    pub gemini: ProviderSettings,
    /// Default context window size.
    pub context_window: usize,
    /// Word budget stated in generation prompts.
    pub word_limit: usize,
    /// Quorum K for synthesis agents.
    pub synthesis_quorum: usize,
    /// Minimum interval between posts of the same agent.
    pub rate_limit: Option<Duration>,
    /// Recent posts per agent remembered by moderation.
    pub moderation_history: usize,
    /// Similarity at or above which moderation drops a post.
    pub moderation_similarity: f64,
    /// Timeout applied to each reasoning call.
    pub reasoning_timeout: Duration,
    /// Whether persona completion notes are posted.
    pub completion_notes: bool,
    /// Directory for the prompt log.
    pub log_dir: PathBuf,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup function.
    ///
    /// Used by tests to avoid mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup(PROVIDER_ENV) {
            Some(name) if !name.trim().is_empty() => name.parse()?,
            _ => Provider::default(),
        };

        let rate_limit_secs: u64 = parse_or(&lookup, "AGENT_RATE_LIMIT_SECS", 0)?;
        let moderation_similarity: f64 =
            parse_or(&lookup, "MODERATION_SIMILARITY", DEFAULT_MODERATION_SIMILARITY)?;
        if !(moderation_similarity > 0.0 && moderation_similarity <= 1.0) {
            return Err(ConfigError::Invalid {
                var: "MODERATION_SIMILARITY".to_string(),
                value: moderation_similarity.to_string(),
            });
        }

        let settings = Self {
            provider,
            openai: provider_settings(&lookup, Provider::OpenAi)?,
            openrouter: provider_settings(&lookup, Provider::OpenRouter)?,
            gemini: provider_settings(&lookup, Provider::Gemini)?,
            context_window: parse_or(&lookup, "CONTEXT_WINDOW", DEFAULT_CONTEXT_WINDOW)?,
            word_limit: parse_or(&lookup, "AGENT_WORD_LIMIT", DEFAULT_WORD_LIMIT)?,
            synthesis_quorum: parse_or(&lookup, "SYNTHESIS_QUORUM", DEFAULT_QUORUM)?,
            rate_limit: (rate_limit_secs > 0).then(|| Duration::from_secs(rate_limit_secs)),
            moderation_history: parse_or(&lookup, "MODERATION_HISTORY", DEFAULT_MODERATION_HISTORY)?,
            moderation_similarity,
            reasoning_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REASONING_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            completion_notes: parse_bool(&lookup, "COMPLETION_NOTES")?,
            log_dir: lookup(LOG_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        };

        debug!(provider = %settings.provider, "settings loaded");
        Ok(settings)
    }

    /// Settings for the given provider.
    pub fn provider_settings(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::OpenRouter => &self.openrouter,
            Provider::Gemini => &self.gemini,
        }
    }

    /// Resolves the provider to use.
    ///
    /// The selected provider wins when it has a key; otherwise the first
    /// provider with a key in [`Provider::ALL`] order is used.
    pub fn resolve_provider(&self) -> Result<Provider> {
        if self.provider_settings(self.provider).is_available() {
            return Ok(self.provider);
        }
        Provider::ALL
            .into_iter()
            .find(|p| self.provider_settings(*p).is_available())
            .ok_or(ConfigError::NoProvider)
    }

    /// Lists required variables that are missing for the selected provider.
    pub fn missing_vars(&self) -> Vec<String> {
        if self.provider_settings(self.provider).is_available() {
            Vec::new()
        } else {
            vec![self.provider.api_key_var()]
        }
    }

    /// Validates that the selected provider is usable.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_vars();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingVars(missing))
        }
    }
}

/// Loads `.env` and `.env.local` from the working directory, if present.
///
/// Values already set in the environment are not overridden.
pub fn load_env_files() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
}

fn provider_settings<F>(lookup: &F, provider: Provider) -> Result<ProviderSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = provider.env_prefix();
    Ok(ProviderSettings {
        api_key: lookup(&provider.api_key_var()).filter(|k| !k.trim().is_empty()),
        model: lookup(&format!("{prefix}_MODEL"))
            .unwrap_or_else(|| provider.default_model().to_string()),
        max_tokens: parse_or(lookup, &format!("{prefix}_MAX_TOKENS"), DEFAULT_MAX_TOKENS)?,
        temperature: parse_or(lookup, &format!("{prefix}_TEMPERATURE"), DEFAULT_TEMPERATURE)?,
    })
}

fn parse_or<F, T>(lookup: &F, var: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: var.to_string(),
                value,
            })
        }
        _ => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, var: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => Err(ConfigError::Invalid {
                var: var.to_string(),
                value: v,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.provider, Provider::OpenAi);
        assert_eq!(s.context_window, 5);
        assert_eq!(s.word_limit, 100);
        assert_eq!(s.synthesis_quorum, 3);
        assert_eq!(s.rate_limit, None);
        assert_eq!(s.moderation_history, 5);
        assert_eq!(s.moderation_similarity, 0.9);
        assert_eq!(s.reasoning_timeout, Duration::from_secs(60));
        assert!(!s.completion_notes);
        assert_eq!(s.log_dir, PathBuf::from("logs"));
        assert_eq!(s.openai.model, "gpt-3.5-turbo");
        assert_eq!(s.gemini.model, "gemini-1.5-flash");
        assert_eq!(s.openai.max_tokens, 500);
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("LLM_PROVIDER", "Gemini"),
            ("GEMINI_API_KEY", "g-key"),
            ("CONTEXT_WINDOW", "1"),
            ("SYNTHESIS_QUORUM", "4"),
            ("AGENT_RATE_LIMIT_SECS", "10"),
            ("MODERATION_HISTORY", "2"),
            ("MODERATION_SIMILARITY", "0.75"),
            ("COMPLETION_NOTES", "yes"),
            ("PARLEY_LOG_DIR", "/tmp/parley-logs"),
        ])
        .unwrap();

        assert_eq!(s.provider, Provider::Gemini);
        assert_eq!(s.context_window, 1);
        assert_eq!(s.synthesis_quorum, 4);
        assert_eq!(s.rate_limit, Some(Duration::from_secs(10)));
        assert_eq!(s.moderation_history, 2);
        assert_eq!(s.moderation_similarity, 0.75);
        assert!(s.completion_notes);
        assert_eq!(s.log_dir, PathBuf::from("/tmp/parley-logs"));
        assert!(s.gemini.is_available());
    }

    #[test]
    fn test_invalid_number() {
        let err = settings(&[("CONTEXT_WINDOW", "five")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "CONTEXT_WINDOW"));
    }

    #[test]
    fn test_similarity_out_of_range() {
        for value in ["0", "1.5", "-0.2", "NaN"] {
            let err = settings(&[("MODERATION_SIMILARITY", value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { ref var, .. } if var == "MODERATION_SIMILARITY"),
                "{value} accepted"
            );
        }
        assert!(settings(&[("MODERATION_SIMILARITY", "1")]).is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        let err = settings(&[("LLM_PROVIDER", "llama")]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(_)));
    }

    #[test]
    fn test_validate_missing_key() {
        let s = settings(&[]).unwrap();
        match s.validate() {
            Err(ConfigError::MissingVars(vars)) => assert_eq!(vars, vec!["OPENAI_API_KEY"]),
            other => panic!("expected MissingVars, got {:?}", other),
        }

        let s = settings(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_empty_key_is_missing() {
        let s = settings(&[("OPENAI_API_KEY", "  ")]).unwrap();
        assert!(!s.openai.is_available());
    }

    #[test]
    fn test_resolve_provider_fallback() {
        let s = settings(&[("OPENROUTER_API_KEY", "or-key")]).unwrap();
        assert_eq!(s.resolve_provider().unwrap(), Provider::OpenRouter);

        let s = settings(&[("LLM_PROVIDER", "gemini"), ("GEMINI_API_KEY", "g")]).unwrap();
        assert_eq!(s.resolve_provider().unwrap(), Provider::Gemini);

        let s = settings(&[]).unwrap();
        assert!(matches!(s.resolve_provider(), Err(ConfigError::NoProvider)));
    }

    #[test]
    fn test_provider_display_roundtrip() {
        for provider in Provider::ALL {
            assert_eq!(provider.to_string().parse::<Provider>().unwrap(), provider);
        }
    }
}
