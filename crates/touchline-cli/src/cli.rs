use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "touchline")]
#[command(about = "Track five-a-side matches from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local data directory
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue a new match (works offline; delivered on the next sync)
    #[command(alias = "new")]
    Add {
        /// Opposing team name
        opponent: String,
        /// Scheduled kickoff as Unix milliseconds
        #[arg(long, value_name = "MILLIS")]
        scheduled_at: Option<i64>,
    },
    /// Queue an update to an existing match
    Update {
        /// Match id (provisional or server-side)
        id: String,
        /// Goals scored by our side
        #[arg(long)]
        goals_for: Option<u32>,
        /// Goals conceded
        #[arg(long)]
        goals_against: Option<u32>,
        /// Correct the opponent name
        #[arg(long)]
        opponent: Option<String>,
        /// Player line as name[:goals[:assists]]; repeatable
        #[arg(long = "player", value_name = "LINE")]
        players: Vec<String>,
        /// Mark the match as played to completion
        #[arg(long)]
        finished: bool,
        /// Re-schedule kickoff as Unix milliseconds
        #[arg(long, value_name = "MILLIS")]
        scheduled_at: Option<i64>,
    },
    /// List queued operations waiting for delivery
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show pending count, last sync time, and phase
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drain the queue against the configured sync endpoint
    Sync,
    /// Show or clear the offline match snapshot
    Snapshot {
        /// Drop the stored snapshot
        #[arg(long)]
        clear: bool,
    },
}
