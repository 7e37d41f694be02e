use crate::commands::common::build_engine;
use crate::config::CliConfig;
use crate::error::CliError;

pub async fn run_sync(config: &CliConfig) -> Result<(), CliError> {
    let engine = build_engine(config)?;

    let before = engine.status()?;
    if before.pending_count == 0 {
        println!("Nothing to sync.");
        return Ok(());
    }

    let outcome = engine.sync_now().await?;
    println!(
        "Sync complete: {} delivered, {} failed",
        outcome.succeeded, outcome.failed
    );

    let after = engine.status()?;
    if after.stuck_count > 0 {
        println!(
            "{} operation(s) exhausted their retries and need attention (see `touchline queue`)",
            after.stuck_count
        );
    }
    Ok(())
}
