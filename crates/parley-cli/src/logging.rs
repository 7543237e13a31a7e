//! Tracing initialisation.
//!
//! Two layers share one registry:
//! - the terminal layer on stderr, filtered by `RUST_LOG` or the `-v` count,
//!   with the prompt log target switched off
//! - a file layer that receives only [`PROMPT_LOG_TARGET`] events, written to
//!   a per-run `prompts_<YYYYmmdd_HHMMSS>.log` in the log directory

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use parley_agent::PROMPT_LOG_TARGET;
use tracing::{warn, Level};
use tracing_subscriber::filter::{Directive, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::error::{CliError, Result};

/// File name of the prompt log for a run started at `at`.
pub fn prompt_log_name(at: DateTime<Local>) -> String {
    format!("prompts_{}.log", at.format("%Y%m%d_%H%M%S"))
}

/// Creates the log directory if needed and opens a fresh prompt log in it.
pub fn open_prompt_log(dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(prompt_log_name(Local::now()));
    let file = File::create(&path)?;
    Ok((path, file))
}

/// Installs the global subscriber. Returns the prompt log path, if one
/// could be opened.
pub fn init(level: Level, log_dir: &Path) -> Result<Option<PathBuf>> {
    let quiet_prompts = format!("{}=off", PROMPT_LOG_TARGET)
        .parse::<Directive>()
        .map_err(|e| CliError::Logging(e.to_string()))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()))
        .add_directive(quiet_prompts);

    let terminal = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter);

    let (path, prompts, open_error) = match open_prompt_log(log_dir) {
        Ok((path, file)) => {
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_filter(Targets::new().with_target(PROMPT_LOG_TARGET, Level::TRACE));
            (Some(path), Some(layer), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(terminal)
        .with(prompts)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;

    if let Some(e) = open_error {
        warn!(dir = %log_dir.display(), "prompt log disabled: {}", e);
    }

    Ok(path)
}
