//! Queued operation model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kind of mutation carried by an [`OperationRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Create a new match under a client-generated provisional id
    Create,
    /// Update an existing match by its server id
    Update,
}

impl OperationKind {
    /// Wire discriminator used by the batch sync endpoint
    #[must_use]
    pub const fn wire_type(self) -> &'static str {
        match self {
            Self::Create => "match-create",
            Self::Update => "match-update",
        }
    }

    /// Parse a wire discriminator back into a kind
    #[must_use]
    pub fn from_wire_type(value: &str) -> Option<Self> {
        match value {
            "match-create" => Some(Self::Create),
            "match-update" => Some(Self::Update),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_type())
    }
}

/// A queued intent to create or update one match.
///
/// `id` is the stable identity of the *target* entity: a client-generated
/// provisional id for creates, the real server id for updates. It doubles
/// as the dedupe key (at most one record per target id is ever queued) and
/// as the join key for per-operation results coming back from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Target entity id (provisional for creates)
    pub id: String,
    /// Create or update
    pub kind: OperationKind,
    /// Opaque domain fields; the engine only transports them
    pub payload: Value,
    /// Enqueue timestamp (Unix ms); the server uses it as the
    /// authoritative created/updated stamp for the write
    pub queued_at: i64,
    /// Failed delivery attempts so far
    #[serde(default)]
    pub attempts: u32,
}

impl OperationRecord {
    /// Create a fresh record stamped with the current time
    #[must_use]
    pub fn new(kind: OperationKind, id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            queued_at: chrono::Utc::now().timestamp_millis(),
            attempts: 0,
        }
    }

    /// Whether automatic retries for this record are exhausted.
    ///
    /// An exhausted record stays queued and visible to the user as a
    /// stuck item, but it is excluded from automatically submitted
    /// batches.
    #[must_use]
    pub const fn is_exhausted(&self, max_attempts: u32) -> bool {
        self.attempts >= max_attempts
    }
}
