use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use touchline_core::store::FsStorage;
use touchline_core::sync::HttpSyncBackend;
use touchline_core::{
    EngineConfig, LocalStateStore, OperationRecord, PlayerLine, SyncEngine,
};

use crate::config::CliConfig;
use crate::error::CliError;

/// Open the local state store under the configured data directory
pub fn open_store(config: &CliConfig) -> Result<LocalStateStore, CliError> {
    let storage = FsStorage::new(config.state_dir())?;
    Ok(LocalStateStore::new(
        Arc::new(storage),
        EngineConfig::default().debounce_window,
    ))
}

/// Assemble a full engine pointed at the configured sync endpoint
pub fn build_engine(config: &CliConfig) -> Result<SyncEngine, CliError> {
    let url = config
        .sync_url
        .as_deref()
        .ok_or(CliError::SyncNotConfigured)?;
    let backend = HttpSyncBackend::new(url, config.sync_token.clone())?;
    tracing::debug!(endpoint = %backend.endpoint(), "sync endpoint resolved");
    let storage = FsStorage::new(config.state_dir())?;
    Ok(SyncEngine::new(
        EngineConfig::default(),
        Arc::new(storage),
        Arc::new(backend),
    ))
}

/// Parse a `--player` value of the form `name[:goals[:assists]]`
pub fn parse_player_line(raw: &str) -> Result<PlayerLine, CliError> {
    let mut parts = raw.split(':');
    let name = parts
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CliError::InvalidPlayerLine(raw.to_string()))?;

    let mut numbers = [0u32; 2];
    for slot in &mut numbers {
        match parts.next() {
            Some(value) => {
                *slot = value
                    .trim()
                    .parse()
                    .map_err(|_| CliError::InvalidPlayerLine(raw.to_string()))?;
            }
            None => break,
        }
    }
    if parts.next().is_some() {
        return Err(CliError::InvalidPlayerLine(raw.to_string()));
    }

    Ok(PlayerLine {
        name: name.to_string(),
        goals: numbers[0],
        assists: numbers[1],
    })
}

/// Build the partial-update payload for a queued match-update
pub fn build_update_payload(
    goals_for: Option<u32>,
    goals_against: Option<u32>,
    opponent: Option<&str>,
    players: &[String],
    finished: bool,
    scheduled_at: Option<i64>,
) -> Result<Value, CliError> {
    let mut data = Map::new();
    if let Some(goals) = goals_for {
        data.insert("goalsFor".to_string(), goals.into());
    }
    if let Some(goals) = goals_against {
        data.insert("goalsAgainst".to_string(), goals.into());
    }
    if let Some(name) = opponent.map(str::trim).filter(|name| !name.is_empty()) {
        data.insert("opponent".to_string(), name.into());
    }
    if !players.is_empty() {
        let lines = players
            .iter()
            .map(|raw| parse_player_line(raw))
            .collect::<Result<Vec<PlayerLine>, CliError>>()?;
        data.insert("players".to_string(), serde_json::to_value(lines)?);
    }
    if finished {
        data.insert("finished".to_string(), true.into());
    }
    if let Some(at) = scheduled_at {
        data.insert("scheduledAt".to_string(), at.into());
    }

    if data.is_empty() {
        return Err(CliError::EmptyUpdate);
    }
    Ok(Value::Object(data))
}

/// Queue entry shape for `--json` output
#[derive(Debug, Serialize)]
pub struct QueueItem {
    pub id: String,
    pub kind: String,
    pub attempts: u32,
    pub stuck: bool,
    pub queued_at: i64,
    pub relative_time: String,
}

pub fn operation_to_item(op: &OperationRecord, max_attempts: u32, now_ms: i64) -> QueueItem {
    QueueItem {
        id: op.id.clone(),
        kind: op.kind.wire_type().to_string(),
        attempts: op.attempts,
        stuck: op.is_exhausted(max_attempts),
        queued_at: op.queued_at,
        relative_time: format_relative_time(op.queued_at, now_ms),
    }
}

/// Render a past timestamp relative to now (`just now`, `5m ago`, ...)
#[must_use]
pub fn format_relative_time(then_ms: i64, now_ms: i64) -> String {
    let elapsed_ms = now_ms.saturating_sub(then_ms).max(0);
    let minutes = elapsed_ms / 60_000;
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes == 0 {
        "just now".to_string()
    } else if hours == 0 {
        format!("{minutes}m ago")
    } else if days == 0 {
        format!("{hours}h ago")
    } else {
        format!("{days}d ago")
    }
}

/// Render a Unix-ms timestamp as a UTC label
#[must_use]
pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || "unknown".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
