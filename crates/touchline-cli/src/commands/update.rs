use touchline_core::OperationKind;

use crate::commands::common::{build_update_payload, open_store};
use crate::config::CliConfig;
use crate::error::CliError;

#[allow(clippy::too_many_arguments)]
pub fn run_update(
    id: &str,
    goals_for: Option<u32>,
    goals_against: Option<u32>,
    opponent: Option<&str>,
    players: &[String],
    finished: bool,
    scheduled_at: Option<i64>,
    config: &CliConfig,
) -> Result<(), CliError> {
    let payload = build_update_payload(
        goals_for,
        goals_against,
        opponent,
        players,
        finished,
        scheduled_at,
    )?;

    let store = open_store(config)?;
    let queued = store.enqueue_operation(OperationKind::Update, id.trim(), payload)?;

    println!("Queued match-update {}", queued.id);
    Ok(())
}
