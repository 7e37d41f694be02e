//! Match model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a match, using UUID v7 (time-sortable).
///
/// Matches created while offline get a client-generated provisional id;
/// the server adopts it on first sync, so the id stays stable across
/// the create/update lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(Uuid);

impl MatchId {
    /// Create a new unique match ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MatchId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Per-player contribution line within a match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLine {
    /// Player display name
    pub name: String,
    /// Goals scored in this match
    pub goals: u32,
    /// Assists made in this match
    pub assists: u32,
}

/// A five-a-side match being tracked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    /// Unique identifier
    pub id: MatchId,
    /// Opposing team name
    pub opponent: String,
    /// Goals scored by our side
    pub goals_for: u32,
    /// Goals conceded
    pub goals_against: u32,
    /// Per-player goal/assist lines
    #[serde(default)]
    pub players: Vec<PlayerLine>,
    /// Scheduled kickoff (Unix ms), if planned ahead
    #[serde(default)]
    pub scheduled_at: Option<i64>,
    /// Whether the match has been played to completion
    #[serde(default)]
    pub finished: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl MatchRecord {
    /// Create a new match against the given opponent
    #[must_use]
    pub fn new(opponent: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: MatchId::new(),
            opponent: opponent.into(),
            goals_for: 0,
            goals_against: 0,
            players: Vec::new(),
            scheduled_at: None,
            finished: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Render the scoreline as `for-against` (e.g. `3-1`)
    #[must_use]
    pub fn scoreline(&self) -> String {
        format!("{}-{}", self.goals_for, self.goals_against)
    }
}
