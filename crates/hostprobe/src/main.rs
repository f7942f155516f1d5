//! hostprobe CLI
//!
//! Resolves targets from an Ansible/Molecule inventory and verifies their
//! state against a suite of checks.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

mod cli;
mod commands;
mod config;
mod logging;

use cli::{Cli, Command};
use config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(commands::EXIT_CONFIG)
        }
    }
}

async fn run(cli: Cli) -> eyre::Result<ExitCode> {
    color_eyre::install()?;

    let (config, config_path) = Config::locate(cli.config.as_deref())?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    let format = cli.log_format.unwrap_or(config.log.format);
    logging::init(level, format)?;

    match &config_path {
        Some(path) => debug!(path = %path.display(), "loaded config"),
        None => debug!("no config file found, using defaults"),
    }

    match &cli.command {
        Command::Verify(args) => commands::verify(args, &config).await,
        Command::Hosts(args) => commands::hosts(args, &config),
        Command::Inspect(args) => commands::inspect(args, &config).await,
    }
}
