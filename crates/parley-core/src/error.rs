//! Error types for configuration loading.

use thiserror::Error;

/// Errors that can occur while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable holds a value that cannot be parsed.
    #[error("invalid value for {var}: {value:?}")]
    Invalid {
        /// Name of the environment variable.
        var: String,
        /// The offending value.
        value: String,
    },

    /// Unknown reasoning provider name.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Required variables are missing for the selected provider.
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),

    /// No provider has credentials configured.
    #[error("no reasoning provider is configured")]
    NoProvider,
}

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
