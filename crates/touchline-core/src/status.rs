//! Derived sync status shared with the front ends

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of the sync engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    /// Nothing in flight
    #[default]
    Idle,
    /// A sync round is currently running
    Syncing,
    /// The last round delivered every submitted operation
    Success,
    /// The last round left failures behind
    Error,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Read-only projection of engine state for UI consumption.
///
/// Recomputed on demand from the store and the coordinator; nothing here
/// is persisted beyond the last-sync timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Queued operations awaiting delivery
    pub pending_count: usize,
    /// Queued operations that exhausted their automatic retries
    pub stuck_count: usize,
    /// Timestamp (Unix ms) of the last sync attempt, if any
    pub last_sync: Option<i64>,
    /// Current phase
    pub phase: SyncPhase,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn phase_display_labels() {
        assert_eq!(SyncPhase::Idle.to_string(), "idle");
        assert_eq!(SyncPhase::Syncing.to_string(), "syncing");
        assert_eq!(SyncPhase::Success.to_string(), "success");
        assert_eq!(SyncPhase::Error.to_string(), "error");
    }

    #[test]
    fn status_serializes_with_camel_case_keys() {
        let status = SyncStatus {
            pending_count: 2,
            stuck_count: 1,
            last_sync: Some(1_700_000_000_000),
            phase: SyncPhase::Error,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["pendingCount"], 2);
        assert_eq!(value["stuckCount"], 1);
        assert_eq!(value["phase"], "error");
    }
}
