use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] touchline_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Opponent name cannot be empty")]
    EmptyOpponent,
    #[error("Nothing to update: pass at least one field flag")]
    EmptyUpdate,
    #[error("Invalid player line {0:?}: expected name[:goals[:assists]]")]
    InvalidPlayerLine(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Set TOUCHLINE_SYNC_URL (and TOUCHLINE_SYNC_TOKEN), or add syncUrl to the profile file."
    )]
    SyncNotConfigured,
}
