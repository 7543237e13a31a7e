//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use parley_core::Settings;

/// Parley - a room of agents sharing one blackboard
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Roster to run: a built-in name (content, brain, moderation) or a YAML file
    #[arg(short, long, env = "PARLEY_ROSTER", default_value = "content")]
    pub roster: String,

    /// Messages each agent sees (overrides CONTEXT_WINDOW)
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Perspective posts required before a synthesis (overrides SYNTHESIS_QUORUM)
    #[arg(short, long)]
    pub quorum: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and roster, then exit
    Check,

    /// Start the interactive session (default)
    Repl,
}

impl Cli {
    /// Get the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Applies command-line overrides on top of environment settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(window) = self.window {
            settings.context_window = window;
        }
        if let Some(quorum) = self.quorum {
            settings.synthesis_quorum = quorum.max(1);
        }
    }
}
