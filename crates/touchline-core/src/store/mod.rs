//! Local state store: durable queue and debounced snapshot persistence
//!
//! The store is the only component that touches persisted bytes. Queue
//! mutations are written synchronously because losing a queued intent is
//! a correctness violation; snapshot writes are debounced because the
//! snapshot is only a resumability aid and bursty saves would otherwise
//! hammer the substrate.

pub mod fs;
pub mod memory;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::{OperationKind, OperationRecord};

pub use fs::FsStorage;
pub use memory::MemoryStorage;

/// Persisted key holding the pending-operation queue (JSON array)
pub const PENDING_OPERATIONS_KEY: &str = "pending-operations";
/// Persisted key holding the in-progress match snapshot (JSON object)
pub const OFFLINE_SNAPSHOT_KEY: &str = "offline-snapshot";
/// Persisted key holding the last sync attempt timestamp (numeric string)
pub const LAST_SYNC_KEY: &str = "last-sync-timestamp";

/// Scoped key-value persistence contract.
///
/// Implementations must be safe to call from multiple tasks; the store
/// serializes queue mutations on its own and never hands the underlying
/// bytes to any other component.
pub trait StoragePort: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Write `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Delete `key`; deleting an absent key is a no-op
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
struct SnapshotDebounce {
    /// Latest value saved within the current window; `None` once flushed
    /// or cleared
    pending: Option<Value>,
    /// Whether a flush timer is already running for the current window
    timer_armed: bool,
}

struct StoreInner {
    port: Arc<dyn StoragePort>,
    debounce_window: Duration,
    /// Serializes read-modify-write cycles on the queue key
    queue: Mutex<()>,
    snapshot: Mutex<SnapshotDebounce>,
}

/// Durable store for the operation queue, the offline snapshot, and the
/// last-sync timestamp.
///
/// Cheap to clone; clones share the same debounce state and queue lock.
#[derive(Clone)]
pub struct LocalStateStore {
    inner: Arc<StoreInner>,
}

impl LocalStateStore {
    /// Create a store over the given persistence port
    #[must_use]
    pub fn new(port: Arc<dyn StoragePort>, debounce_window: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                port,
                debounce_window,
                queue: Mutex::new(()),
                snapshot: Mutex::new(SnapshotDebounce::default()),
            }),
        }
    }

    fn read_queue(&self) -> Result<Vec<OperationRecord>> {
        match self.inner.port.get(PENDING_OPERATIONS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_queue(&self, queue: &[OperationRecord]) -> Result<()> {
        let raw = serde_json::to_string(queue)?;
        self.inner.port.set(PENDING_OPERATIONS_KEY, &raw)
    }

    /// Queue an operation for later delivery, persisting synchronously.
    ///
    /// At most one record exists per target id: enqueuing for an id that
    /// is already queued replaces the old record (last write wins), which
    /// bounds queue growth and avoids replaying stale intermediate
    /// states. Replacement resets the attempt counter.
    ///
    /// Persistence failures propagate to the caller - a lost intent is a
    /// user-visible error, unlike a lost snapshot.
    pub fn enqueue_operation(
        &self,
        kind: OperationKind,
        target_id: &str,
        payload: Value,
    ) -> Result<OperationRecord> {
        if target_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "operation target id must not be empty".to_string(),
            ));
        }

        let record = OperationRecord::new(kind, target_id, payload);
        let _guard = self
            .inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut queue = self.read_queue()?;
        match queue.iter().position(|op| op.id == record.id) {
            Some(index) => queue[index] = record.clone(),
            None => queue.push(record.clone()),
        }
        self.write_queue(&queue)?;
        Ok(record)
    }

    /// Current queue contents in insertion order
    pub fn list_operations(&self) -> Result<Vec<OperationRecord>> {
        let _guard = self
            .inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.read_queue()
    }

    /// Drop the queued operation for `target_id`, if present.
    ///
    /// Removing an id that is no longer queued is a no-op, not an error.
    pub fn remove_operation(&self, target_id: &str) -> Result<()> {
        let _guard = self
            .inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut queue = self.read_queue()?;
        let before = queue.len();
        queue.retain(|op| op.id != target_id);
        if queue.len() != before {
            self.write_queue(&queue)?;
        }
        Ok(())
    }

    /// Remove the record for `target_id` only if it still carries the
    /// given `queued_at` stamp.
    ///
    /// The coordinator resolves batch results with this guard so an
    /// operation that was replaced while the round was in flight is not
    /// deleted by an acknowledgement addressed to its predecessor.
    pub(crate) fn remove_operation_if(&self, target_id: &str, queued_at: i64) -> Result<()> {
        let _guard = self
            .inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut queue = self.read_queue()?;
        let before = queue.len();
        queue.retain(|op| op.id != target_id || op.queued_at != queued_at);
        if queue.len() != before {
            self.write_queue(&queue)?;
        }
        Ok(())
    }

    /// Bump the attempt counter for `target_id`, if still queued
    pub fn increment_attempts(&self, target_id: &str) -> Result<()> {
        self.bump_attempts(target_id, None)
    }

    /// `queued_at`-guarded variant of [`Self::increment_attempts`]; see
    /// [`Self::remove_operation_if`]
    pub(crate) fn increment_attempts_if(&self, target_id: &str, queued_at: i64) -> Result<()> {
        self.bump_attempts(target_id, Some(queued_at))
    }

    fn bump_attempts(&self, target_id: &str, queued_at: Option<i64>) -> Result<()> {
        let _guard = self
            .inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut queue = self.read_queue()?;
        let target = queue.iter_mut().find(|op| {
            op.id == target_id && queued_at.map_or(true, |stamp| op.queued_at == stamp)
        });
        if let Some(op) = target {
            op.attempts += 1;
            self.write_queue(&queue)?;
        }
        Ok(())
    }

    /// Schedule a debounced snapshot write.
    ///
    /// Bursts within one debounce window collapse into a single physical
    /// write carrying the last value saved. Write failures are logged and
    /// swallowed: the snapshot is a resume point, not a queued intent.
    ///
    /// Must be called from within a tokio runtime.
    pub fn save_snapshot(&self, snapshot: Value) {
        let mut state = self
            .inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.pending = Some(snapshot);
        if state.timer_armed {
            return;
        }
        state.timer_armed = true;
        drop(state);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce_window).await;
            let pending = {
                let mut state = inner
                    .snapshot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                state.timer_armed = false;
                state.pending.take()
            };
            // cleared before the window elapsed, nothing to flush
            let Some(value) = pending else { return };
            let write = serde_json::to_string(&value)
                .map_err(Error::from)
                .and_then(|raw| inner.port.set(OFFLINE_SNAPSHOT_KEY, &raw));
            if let Err(error) = write {
                warn!(%error, "dropping debounced snapshot write");
            }
        });
    }

    /// Best-known in-progress snapshot, preferring a value still waiting
    /// in the debounce window over the persisted one
    pub fn load_snapshot(&self) -> Result<Option<Value>> {
        {
            let state = self
                .inner
                .snapshot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = state.pending.clone() {
                return Ok(Some(value));
            }
        }
        match self.inner.port.get(OFFLINE_SNAPSHOT_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Drop the persisted snapshot and discard any pending debounced
    /// write for it
    pub fn clear_snapshot(&self) -> Result<()> {
        {
            let mut state = self
                .inner
                .snapshot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            state.pending = None;
        }
        self.inner.port.remove(OFFLINE_SNAPSHOT_KEY)
    }

    /// Timestamp (Unix ms) of the last sync attempt, if any
    pub fn last_sync_timestamp(&self) -> Result<Option<i64>> {
        Ok(self
            .inner
            .port
            .get(LAST_SYNC_KEY)?
            .and_then(|raw| raw.trim().parse().ok()))
    }

    /// Record the timestamp (Unix ms) of a sync attempt
    pub fn set_last_sync_timestamp(&self, timestamp: i64) -> Result<()> {
        self.inner.port.set(LAST_SYNC_KEY, &timestamp.to_string())
    }
}
