use touchline_core::{EngineConfig, SyncPhase, SyncStatus};

use crate::commands::common::{format_sync_timestamp, open_store};
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_status(as_json: bool, config: &CliConfig) -> Result<(), CliError> {
    let store = open_store(config)?;
    let operations = store.list_operations()?;
    let max_attempts = EngineConfig::default().max_attempts;

    // a fresh CLI process is never mid-round, so the phase is idle
    let status = SyncStatus {
        pending_count: operations.len(),
        stuck_count: operations
            .iter()
            .filter(|op| op.is_exhausted(max_attempts))
            .count(),
        last_sync: store.last_sync_timestamp()?,
        phase: SyncPhase::Idle,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "Pending operations: {} ({} stuck)",
        status.pending_count, status.stuck_count
    );
    match status.last_sync {
        Some(timestamp) => println!("Last sync: {}", format_sync_timestamp(timestamp)),
        None => println!("Last sync: never"),
    }
    println!("Phase: {}", status.phase);
    Ok(())
}
