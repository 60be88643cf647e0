mod commands;
mod config;
mod google;
mod logging;
mod telegram;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "calwatch")]
#[command(about = "Announce Google Calendar changes in a Telegram chat")]
struct Cli {
    /// Config file (default: ~/.config/calwatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll once and notify about changes since the last run
    Run,
    /// Poll on an interval until interrupted
    Watch {
        /// Time between runs (e.g. "5m", "90s")
        #[arg(long, default_value = "5m", value_parser = commands::watch::parse_every)]
        every: Duration,
    },
    /// Show when the last successful run happened
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => commands::run::run(&config).await,
        Commands::Watch { every } => commands::watch::run(&config, every).await,
        Commands::Status => commands::status::run(&config),
    }
}
