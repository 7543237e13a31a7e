//! Parley CLI library.
//!
//! This crate provides the `parley` command line, the interactive REPL that
//! posts user input to the blackboard and prints agent output as it lands,
//! and the tracing setup that splits the prompt log into its own file.

pub mod cli;
pub mod commands;
pub mod display;
pub mod error;
pub mod logging;
pub mod repl;

pub use error::{CliError, Result};
