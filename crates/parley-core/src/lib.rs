//! Parley Core - configuration shared by every Parley crate.
//!
//! - **config**: environment-driven [`Settings`] and provider resolution
//! - **error**: [`ConfigError`]

pub mod config;
pub mod error;

pub use config::{load_env_files, Provider, ProviderSettings, Settings};
pub use error::{ConfigError, Result};
