//! Error types for the orchestrator crate.

use thiserror::Error;

/// Errors that can occur while orchestrating agents.
///
/// Per-agent reasoning failures are not here: they end up as
/// [`crate::RoundOutcome::Failed`] entries. Only configuration problems,
/// lifecycle misuse and blackboard faults surface as errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Blackboard storage fault. Fatal.
    #[error("blackboard error: {0}")]
    Board(#[from] parley_board::BoardError),

    /// Agent construction error.
    #[error("agent error: {0}")]
    Agent(#[from] parley_agent::AgentError),

    /// Settings error.
    #[error("config error: {0}")]
    Config(#[from] parley_core::ConfigError),

    /// Invalid roster or scheduler configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Orchestrator already started.
    #[error("orchestrator already started")]
    AlreadyStarted,

    /// Orchestrator not started.
    #[error("orchestrator not started")]
    NotStarted,

    /// Shutdown error.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
