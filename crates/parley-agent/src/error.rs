//! Error types for the agent crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while an agent decides.
///
/// None of these escape a scheduling round: the scheduler logs them and
/// treats the agent as having abstained.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The reasoning call did not finish in time.
    #[error("reasoning call timed out after {0:?}")]
    Timeout(Duration),

    /// The reasoning service failed (transport, HTTP status, rate limit).
    #[error("reasoning service error: {0}")]
    Service(String),

    /// The service answered, but not in a usable form.
    #[error("malformed decision: {0}")]
    MalformedDecision(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Roster file could not be loaded.
    #[error("roster error: {0}")]
    Roster(String),

    /// Roster file could not be parsed.
    #[error("roster parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Short machine-readable kind, used in logs and round reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Service(_) => "service_error",
            Self::MalformedDecision(_) => "malformed_decision",
            Self::Configuration(_) => "configuration",
            Self::Roster(_) | Self::Yaml(_) => "roster",
            Self::Io(_) => "io",
        }
    }
}

impl From<parley_core::ConfigError> for AgentError {
    fn from(err: parley_core::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
