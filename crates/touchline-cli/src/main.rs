//! Touchline CLI - queue match activity offline, sync when back online
//!
//! Every mutation lands in the local queue first; `touchline sync`
//! drains it against the configured endpoint.

mod cli;
mod commands;
mod config;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = config::resolve(cli.data_dir)?;

    match cli.command {
        Commands::Add {
            opponent,
            scheduled_at,
        } => commands::add::run_add(&opponent, scheduled_at, &config),
        Commands::Update {
            id,
            goals_for,
            goals_against,
            opponent,
            players,
            finished,
            scheduled_at,
        } => commands::update::run_update(
            &id,
            goals_for,
            goals_against,
            opponent.as_deref(),
            &players,
            finished,
            scheduled_at,
            &config,
        ),
        Commands::Queue { json } => commands::queue::run_queue(json, &config),
        Commands::Status { json } => commands::status::run_status(json, &config),
        Commands::Sync => commands::sync::run_sync(&config).await,
        Commands::Snapshot { clear } => commands::snapshot::run_snapshot(clear, &config),
    }
}
