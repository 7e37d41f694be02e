use touchline_core::EngineConfig;

use crate::commands::common::{now_ms, open_store, operation_to_item, QueueItem};
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_queue(as_json: bool, config: &CliConfig) -> Result<(), CliError> {
    let store = open_store(config)?;
    let operations = store.list_operations()?;
    let max_attempts = EngineConfig::default().max_attempts;
    let now = now_ms();

    if as_json {
        let items: Vec<QueueItem> = operations
            .iter()
            .map(|op| operation_to_item(op, max_attempts, now))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if operations.is_empty() {
        println!("No operations queued.");
        return Ok(());
    }

    for op in &operations {
        let item = operation_to_item(op, max_attempts, now);
        let stuck = if item.stuck { " [stuck]" } else { "" };
        println!(
            "{} {} attempts={} queued {}{}",
            item.id, item.kind, item.attempts, item.relative_time, stuck
        );
    }
    Ok(())
}
