//! Error types for blackboard operations.

use thiserror::Error;

/// Errors that can occur during blackboard operations.
#[derive(Error, Debug)]
pub enum BoardError {
    /// Lock poisoned (a writer panicked while holding the log).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type alias for blackboard operations.
pub type Result<T> = std::result::Result<T, BoardError>;
