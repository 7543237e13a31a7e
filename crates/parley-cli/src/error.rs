//! Error types for the command-line front end.

use thiserror::Error;

/// Errors that end a `parley` invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be read or is incomplete.
    #[error("{0}")]
    Config(#[from] parley_core::ConfigError),

    /// Roster or reasoning client could not be built.
    #[error("{0}")]
    Agent(#[from] parley_agent::AgentError),

    /// Orchestrator failed to start or stop.
    #[error("{0}")]
    Orchestrator(#[from] parley_orchestrator::OrchestratorError),

    /// Terminal line editor failure.
    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// Logging could not be initialised.
    #[error("logging error: {0}")]
    Logging(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
