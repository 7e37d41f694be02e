use touchline_core::{MatchRecord, OperationKind};

use crate::commands::common::open_store;
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_add(
    opponent: &str,
    scheduled_at: Option<i64>,
    config: &CliConfig,
) -> Result<(), CliError> {
    let opponent = opponent.trim();
    if opponent.is_empty() {
        return Err(CliError::EmptyOpponent);
    }

    let mut record = MatchRecord::new(opponent);
    record.scheduled_at = scheduled_at;

    let store = open_store(config)?;
    let queued = store.enqueue_operation(
        OperationKind::Create,
        &record.id.as_str(),
        serde_json::to_value(&record)?,
    )?;

    println!("Queued match-create {} vs {}", queued.id, record.opponent);
    Ok(())
}
