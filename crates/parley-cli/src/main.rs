//! Parley CLI entry point.

use clap::Parser;
use parley_core::Settings;
use tracing::info;

use parley_cli::cli::Cli;
use parley_cli::{commands, logging};

fn main() {
    // .env.local then .env (API keys etc.)
    parley_core::load_env_files();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> parley_cli::Result<()> {
    let mut settings = Settings::from_env()?;
    cli.apply(&mut settings);

    if let Some(path) = logging::init(cli.log_level(), &settings.log_dir)? {
        info!(path = %path.display(), "prompt log opened");
    }

    commands::execute(cli.command, &settings, &cli.roster)
}
