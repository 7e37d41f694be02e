//! Process-wide sync engine assembly
//!
//! One [`SyncEngine`] is constructed per process/session with explicit
//! storage and backend ports; nothing in this crate reaches for ambient
//! global state, so the whole engine runs under test without a platform.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::connectivity::ConnectivityMonitor;
use crate::error::Result;
use crate::models::{OperationKind, OperationRecord};
use crate::status::{SyncPhase, SyncStatus};
use crate::store::{LocalStateStore, StoragePort};
use crate::sync::{SyncBackend, SyncCoordinator, SyncOutcome};

/// Timer and retry tunables for the engine
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Delivery attempts before a queued operation is considered stuck
    pub max_attempts: u32,
    /// Window within which snapshot saves coalesce into one write
    pub debounce_window: Duration,
    /// Wait after an online transition before syncing, to ride out
    /// connection flapping
    pub settle_delay: Duration,
    /// How long a success/error phase stays visible before returning to
    /// idle
    pub phase_display: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            debounce_window: Duration::from_millis(300),
            settle_delay: Duration::from_secs(2),
            phase_display: Duration::from_secs(3),
        }
    }
}

/// The offline sync engine.
///
/// Owns the local state store, the sync coordinator, and the
/// connectivity monitor; front ends talk to the engine and never to the
/// persisted bytes directly.
pub struct SyncEngine {
    config: EngineConfig,
    store: LocalStateStore,
    coordinator: Arc<SyncCoordinator>,
    connectivity: ConnectivityMonitor,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Assemble an engine over the given ports.
    ///
    /// The engine starts out assuming it is online; hosts push the real
    /// state via [`SyncEngine::set_online`] once they know it.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        storage: Arc<dyn StoragePort>,
        backend: Arc<dyn SyncBackend>,
    ) -> Self {
        let store = LocalStateStore::new(storage, config.debounce_window);
        let coordinator = Arc::new(SyncCoordinator::new(
            store.clone(),
            backend,
            config.max_attempts,
            config.phase_display,
        ));
        Self {
            config,
            store,
            coordinator,
            connectivity: ConnectivityMonitor::new(true),
            watcher: Mutex::new(None),
        }
    }

    /// Spawn the connectivity watcher task. Idempotent.
    ///
    /// On an offline-to-online transition the watcher waits out the
    /// settle delay, re-checks that the connection held, and triggers
    /// exactly one sync round (concurrent triggers no-op against the
    /// single-flight guard). On a transition to offline it resets the
    /// phase to idle and touches nothing else.
    pub fn start(&self) {
        let mut slot = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }

        let mut rx = self.connectivity.subscribe();
        let coordinator = Arc::clone(&self.coordinator);
        let settle = self.config.settle_delay;
        *slot = Some(tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if !online {
                    coordinator.reset_phase();
                    continue;
                }

                tokio::time::sleep(settle).await;
                if !*rx.borrow_and_update() {
                    // flapped back offline before settling, skip this trigger
                    continue;
                }
                match coordinator.sync_now().await {
                    Ok(outcome) => info!(
                        succeeded = outcome.succeeded,
                        failed = outcome.failed,
                        "reconnect sync finished"
                    ),
                    Err(error) => warn!(%error, "reconnect sync failed"),
                }
            }
        }));
    }

    /// Queue a match-create operation under a client-generated
    /// provisional id
    pub fn enqueue_create(&self, target_id: &str, payload: Value) -> Result<OperationRecord> {
        self.store
            .enqueue_operation(OperationKind::Create, target_id, payload)
    }

    /// Queue a match-update operation for an existing match
    pub fn enqueue_update(&self, target_id: &str, payload: Value) -> Result<OperationRecord> {
        self.store
            .enqueue_operation(OperationKind::Update, target_id, payload)
    }

    /// Debounced save of the in-progress match snapshot
    pub fn save_snapshot(&self, snapshot: Value) {
        self.store.save_snapshot(snapshot);
    }

    /// Load the in-progress match snapshot, if one exists
    pub fn load_snapshot(&self) -> Result<Option<Value>> {
        self.store.load_snapshot()
    }

    /// Drop the in-progress snapshot once its state is durably committed
    pub fn clear_snapshot(&self) -> Result<()> {
        self.store.clear_snapshot()
    }

    /// Run one sync round right now (manual trigger)
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        self.coordinator.sync_now().await
    }

    /// Recompute the status projection from current state
    pub fn status(&self) -> Result<SyncStatus> {
        let queue = self.store.list_operations()?;
        Ok(SyncStatus {
            pending_count: queue.len(),
            stuck_count: queue
                .iter()
                .filter(|op| op.is_exhausted(self.config.max_attempts))
                .count(),
            last_sync: self.store.last_sync_timestamp()?,
            phase: self.coordinator.phase(),
        })
    }

    /// Push a connectivity transition from the host
    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
    }

    /// Current connectivity state
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Subscribe to sync phase transitions
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.coordinator.subscribe_phase()
    }

    /// Direct access to the local state store
    #[must_use]
    pub fn store(&self) -> &LocalStateStore {
        &self.store
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        let mut slot = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
