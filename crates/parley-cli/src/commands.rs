//! Command handlers for CLI subcommands.

use parley_agent::{reasoner, Roster};
use parley_core::Settings;
use parley_orchestrator::Orchestrator;
use tracing::info;

use crate::cli::Commands;
use crate::error::Result;
use crate::repl::Repl;

/// Execute a CLI command. No command means the REPL.
pub fn execute(command: Option<Commands>, settings: &Settings, roster: &str) -> Result<()> {
    match command {
        Some(Commands::Check) => cmd_check(settings, roster),
        Some(Commands::Repl) | None => cmd_repl(settings, roster),
    }
}

/// Validates settings and roster without starting anything.
fn cmd_check(settings: &Settings, roster: &str) -> Result<()> {
    let orchestrator = assemble(settings, roster)?;
    let provider = settings.resolve_provider()?;
    let model = &settings.provider_settings(provider).model;

    let missing = settings.missing_vars();
    if !missing.is_empty() {
        println!(
            "Provider: {} (model {}), {} is missing {}",
            provider,
            model,
            settings.provider,
            missing.join(", ")
        );
    } else {
        println!("Provider: {} (model {})", provider, model);
    }
    println!(
        "Window: {}  Quorum: {}  Timeout: {}s",
        settings.context_window,
        settings.synthesis_quorum,
        settings.reasoning_timeout.as_secs()
    );
    println!("Roster: {}", roster);
    for (name, role) in orchestrator.agents() {
        println!("  {} ({})", name, role);
    }
    println!("Configuration OK");
    Ok(())
}

fn cmd_repl(settings: &Settings, roster: &str) -> Result<()> {
    let orchestrator = assemble(settings, roster)?;
    let history = settings.log_dir.join("repl_history.txt");
    Repl::new(orchestrator, roster)?.with_history(history).run()
}

/// Resolves the provider and roster and builds the orchestrator.
///
/// A selected provider without a key is not fatal as long as another
/// provider has one.
fn assemble(settings: &Settings, roster: &str) -> Result<Orchestrator> {
    settings.resolve_provider()?;
    let roster = Roster::resolve(roster)?;
    let reasoner = reasoner::from_settings(settings)?;
    let orchestrator = Orchestrator::from_settings(settings, &roster, reasoner)?;
    info!(roster = %roster.name, "orchestrator ready");
    Ok(orchestrator)
}
