//! Sync coordinator and batch endpoint contract
//!
//! The coordinator drains the pending-operation queue against the remote
//! batch endpoint: one request per round carrying every eligible
//! operation, per-operation outcomes resolved back into the queue, and a
//! whole-batch retry when the transport itself fails. At most one round
//! runs at a time no matter how many triggers fire.

pub mod http;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::OperationRecord;
use crate::status::SyncPhase;
use crate::store::LocalStateStore;

pub use http::HttpSyncBackend;

/// Transport-level descriptor for one queued operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Target entity id
    pub id: String,
    /// Wire discriminator (`match-create` / `match-update`)
    #[serde(rename = "type")]
    pub op_type: String,
    /// Opaque domain payload
    pub data: Value,
    /// Client enqueue timestamp (Unix ms); authoritative for the
    /// server-side created/updated stamps
    pub timestamp: i64,
}

impl From<&OperationRecord> for OperationDescriptor {
    fn from(record: &OperationRecord) -> Self {
        Self {
            id: record.id.clone(),
            op_type: record.kind.wire_type().to_string(),
            data: record.payload.clone(),
            timestamp: record.queued_at,
        }
    }
}

/// Request body for `POST /sync`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// The whole eligible queue, submitted as one batch
    pub operations: Vec<OperationDescriptor>,
}

/// Per-operation success entry in a [`SyncResponse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Target entity id this outcome refers to
    pub id: String,
    /// Whether the server applied the operation
    pub success: bool,
    /// Server-side representation after applying, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Per-operation rejection entry in a [`SyncResponse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationFault {
    /// Target entity id this fault refers to
    pub id: String,
    /// Human-readable rejection reason
    pub error: String,
}

/// Response body from the batch sync endpoint.
///
/// The server processes each operation independently and tolerantly (one
/// rejection never aborts the rest) and is assumed to upsert
/// idempotently per operation id, since a lost response makes the client
/// resubmit the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Whether the request as a whole was accepted
    pub success: bool,
    /// Outcomes for applied (or attempted) operations
    #[serde(default)]
    pub results: Vec<OperationOutcome>,
    /// Rejected operations with reasons
    #[serde(default)]
    pub errors: Vec<OperationFault>,
    /// Server clock at processing time (Unix ms)
    #[serde(default)]
    pub last_sync: Option<i64>,
    /// How many operations the server looked at
    #[serde(default)]
    pub processed_count: usize,
}

/// Batch sync endpoint consumed by the coordinator.
///
/// An `Err` from [`SyncBackend::submit_batch`] means transport-level
/// failure (no response, or a non-2xx status): the coordinator treats
/// every submitted operation as failed for that round and retries the
/// whole batch later.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Submit one batch of operations and return per-operation outcomes
    async fn submit_batch(&self, request: &SyncRequest) -> Result<SyncResponse>;
}

/// Result of one sync round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Operations acknowledged and removed from the queue
    pub succeeded: usize,
    /// Operations that stay queued for the next round
    pub failed: usize,
}

/// Releases the single-flight flag when the round ends, even if it
/// unwinds through an error path
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single-flight orchestrator draining the queue against the backend.
pub struct SyncCoordinator {
    store: LocalStateStore,
    backend: Arc<dyn SyncBackend>,
    max_attempts: u32,
    phase_display: Duration,
    in_flight: AtomicBool,
    phase: Arc<watch::Sender<SyncPhase>>,
    /// Monotonic round counter; pending phase-reset timers from older
    /// rounds check it before touching the phase
    round: Arc<AtomicU64>,
}

impl SyncCoordinator {
    /// Create a coordinator over the given store and backend
    #[must_use]
    pub fn new(
        store: LocalStateStore,
        backend: Arc<dyn SyncBackend>,
        max_attempts: u32,
        phase_display: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            store,
            backend,
            max_attempts,
            phase_display,
            in_flight: AtomicBool::new(false),
            phase: Arc::new(phase),
            round: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Subscribe to phase transitions
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Force the phase back to idle (used on the offline transition) and
    /// cancel any pending display-window reset
    pub fn reset_phase(&self) {
        self.round.fetch_add(1, Ordering::AcqRel);
        self.phase.send_replace(SyncPhase::Idle);
    }

    /// Run one sync round.
    ///
    /// Concurrent triggers no-op: if a round is already in flight the
    /// call returns immediately with an all-zero outcome instead of
    /// double-submitting. Operations enqueued while the round is running
    /// are not part of it; they stay queued for the next trigger.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sync already in flight, ignoring trigger");
            return Ok(SyncOutcome::default());
        }
        let _guard = InFlightGuard(&self.in_flight);
        self.phase.send_replace(SyncPhase::Syncing);

        match self.run_round().await {
            Ok(None) => {
                self.phase.send_replace(SyncPhase::Idle);
                Ok(SyncOutcome::default())
            }
            Ok(Some(outcome)) => {
                let phase = if outcome.failed == 0 {
                    SyncPhase::Success
                } else {
                    SyncPhase::Error
                };
                self.finish_phase(phase);
                Ok(outcome)
            }
            Err(error) => {
                self.finish_phase(SyncPhase::Error);
                Err(error)
            }
        }
    }

    /// Returns `None` when there was nothing eligible to submit
    async fn run_round(&self) -> Result<Option<SyncOutcome>> {
        let batch: Vec<OperationRecord> = self
            .store
            .list_operations()?
            .into_iter()
            .filter(|op| !op.is_exhausted(self.max_attempts))
            .collect();
        if batch.is_empty() {
            return Ok(None);
        }

        let request = SyncRequest {
            operations: batch.iter().map(OperationDescriptor::from).collect(),
        };
        debug!(operations = request.operations.len(), "submitting sync batch");

        let outcome = match self.backend.submit_batch(&request).await {
            Ok(response) => self.apply_response(&batch, &response)?,
            Err(error) => {
                warn!(%error, "sync transport failure, whole batch stays queued");
                for op in &batch {
                    self.store.increment_attempts_if(&op.id, op.queued_at)?;
                }
                SyncOutcome {
                    succeeded: 0,
                    failed: batch.len(),
                }
            }
        };

        // a sync attempt happened whether or not every item made it
        self.store
            .set_last_sync_timestamp(chrono::Utc::now().timestamp_millis())?;
        Ok(Some(outcome))
    }

    /// Resolve per-operation outcomes back into the queue.
    ///
    /// Removals and attempt bumps are guarded by the `queued_at` stamp of
    /// the submitted record, so a record replaced while this round was in
    /// flight keeps its fresh intent.
    fn apply_response(
        &self,
        batch: &[OperationRecord],
        response: &SyncResponse,
    ) -> Result<SyncOutcome> {
        let by_id: HashMap<&str, &OperationRecord> =
            batch.iter().map(|op| (op.id.as_str(), op)).collect();
        let mut handled: HashSet<&str> = HashSet::new();
        let mut outcome = SyncOutcome::default();

        for result in &response.results {
            let Some(op) = by_id.get(result.id.as_str()) else {
                debug!(id = %result.id, "result for an operation we did not submit, ignoring");
                continue;
            };
            if !handled.insert(result.id.as_str()) {
                continue;
            }
            if result.success {
                self.store.remove_operation_if(&op.id, op.queued_at)?;
                outcome.succeeded += 1;
            } else {
                self.store.increment_attempts_if(&op.id, op.queued_at)?;
                outcome.failed += 1;
            }
        }

        for fault in &response.errors {
            let Some(op) = by_id.get(fault.id.as_str()) else {
                continue;
            };
            if !handled.insert(fault.id.as_str()) {
                continue;
            }
            debug!(id = %fault.id, error = %fault.error, "operation rejected by backend");
            self.store.increment_attempts_if(&op.id, op.queued_at)?;
            outcome.failed += 1;
        }

        Ok(outcome)
    }

    /// Show a terminal phase for the display window, then fall back to
    /// idle unless a newer round has taken over
    fn finish_phase(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
        let generation = self.round.fetch_add(1, Ordering::AcqRel) + 1;
        let sender = Arc::clone(&self.phase);
        let round = Arc::clone(&self.round);
        let display = self.phase_display;
        tokio::spawn(async move {
            tokio::time::sleep(display).await;
            if round.load(Ordering::Acquire) == generation {
                sender.send_replace(SyncPhase::Idle);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::OperationKind;
    use crate::store::MemoryStorage;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    const DISPLAY: Duration = Duration::from_secs(3);

    /// Scripted backend: pops canned replies, acks everything by default,
    /// and can be gated to keep a request in flight.
    struct MockBackend {
        requests: Mutex<Vec<SyncRequest>>,
        script: Mutex<VecDeque<Result<SyncResponse>>>,
        gate: Semaphore,
    }

    impl MockBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                script: Mutex::new(VecDeque::new()),
                gate: Semaphore::new(Semaphore::MAX_PERMITS),
            })
        }

        /// A backend that holds every request until `release` is called
        fn gated() -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                script: Mutex::new(VecDeque::new()),
                gate: Semaphore::new(0),
            })
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }

        fn push_reply(&self, reply: Result<SyncResponse>) {
            self.script.lock().unwrap().push_back(reply);
        }

        fn requests(&self) -> Vec<SyncRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn ack_all(request: &SyncRequest) -> SyncResponse {
            SyncResponse {
                success: true,
                results: request
                    .operations
                    .iter()
                    .map(|op| OperationOutcome {
                        id: op.id.clone(),
                        success: true,
                        result: None,
                    })
                    .collect(),
                errors: Vec::new(),
                last_sync: Some(1_700_000_000_000),
                processed_count: request.operations.len(),
            }
        }
    }

    #[async_trait]
    impl SyncBackend for MockBackend {
        async fn submit_batch(&self, request: &SyncRequest) -> Result<SyncResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::ack_all(request)))
        }
    }

    fn coordinator_with(backend: Arc<MockBackend>) -> (SyncCoordinator, LocalStateStore) {
        let store = LocalStateStore::new(
            Arc::new(MemoryStorage::new()),
            Duration::from_millis(300),
        );
        let coordinator = SyncCoordinator::new(store.clone(), backend, 5, DISPLAY);
        (coordinator, store)
    }

    #[tokio::test(start_paused = true)]
    async fn empty_queue_skips_the_network_and_stays_idle() {
        let backend = MockBackend::new();
        let (coordinator, _store) = coordinator_with(backend.clone());

        let outcome = coordinator.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome::default());
        assert!(backend.requests().is_empty());
        assert_eq!(coordinator.phase(), SyncPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_round_removes_acked_operations() {
        let backend = MockBackend::new();
        let (coordinator, store) = coordinator_with(backend.clone());
        store
            .enqueue_operation(OperationKind::Create, "m1", json!({"opponent": "FC"}))
            .unwrap();
        store
            .enqueue_operation(OperationKind::Update, "m2", json!({"goalsFor": 1}))
            .unwrap();

        let outcome = coordinator.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome { succeeded: 2, failed: 0 });
        assert!(store.list_operations().unwrap().is_empty());
        assert!(store.last_sync_timestamp().unwrap().is_some());

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].operations[0].op_type, "match-create");
        assert_eq!(requests[0].operations[1].op_type, "match-update");

        assert_eq!(coordinator.phase(), SyncPhase::Success);
        tokio::time::sleep(DISPLAY * 2).await;
        assert_eq!(coordinator.phase(), SyncPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_failure_keeps_only_rejected_operations_queued() {
        let backend = MockBackend::new();
        backend.push_reply(Ok(SyncResponse {
            success: true,
            results: vec![OperationOutcome {
                id: "m1".to_string(),
                success: true,
                result: None,
            }],
            errors: vec![OperationFault {
                id: "m2".to_string(),
                error: "validation failed".to_string(),
            }],
            last_sync: None,
            processed_count: 2,
        }));
        let (coordinator, store) = coordinator_with(backend);
        store
            .enqueue_operation(OperationKind::Create, "m1", json!({}))
            .unwrap();
        store
            .enqueue_operation(OperationKind::Update, "m2", json!({}))
            .unwrap();

        let outcome = coordinator.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome { succeeded: 1, failed: 1 });

        let queue = store.list_operations().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "m2");
        assert_eq!(queue[0].attempts, 1);
        assert_eq!(coordinator.phase(), SyncPhase::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_fails_the_whole_batch() {
        let backend = MockBackend::new();
        backend.push_reply(Err(Error::Api("HTTP 500".to_string())));
        let (coordinator, store) = coordinator_with(backend);
        store
            .enqueue_operation(OperationKind::Create, "m1", json!({}))
            .unwrap();
        store
            .enqueue_operation(OperationKind::Update, "m2", json!({}))
            .unwrap();

        let outcome = coordinator.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome { succeeded: 0, failed: 2 });

        let queue = store.list_operations().unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue.iter().all(|op| op.attempts == 1));
        // the attempt still counts as a sync
        assert!(store.last_sync_timestamp().unwrap().is_some());

        assert_eq!(coordinator.phase(), SyncPhase::Error);
        tokio::time::sleep(DISPLAY * 2).await;
        assert_eq!(coordinator.phase(), SyncPhase::Idle);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_triggers_produce_exactly_one_request() {
        let backend = MockBackend::gated();
        let (coordinator, store) = coordinator_with(backend.clone());
        store
            .enqueue_operation(OperationKind::Create, "m1", json!({}))
            .unwrap();

        let coordinator = Arc::new(coordinator);
        let first = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.sync_now().await }
        });

        // wait for the first round to reach the backend
        while backend.requests().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(coordinator.phase(), SyncPhase::Syncing);

        let second = coordinator.sync_now().await.unwrap();
        assert_eq!(second, SyncOutcome::default());

        backend.release();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, SyncOutcome { succeeded: 1, failed: 0 });
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_operations_stay_queued_but_are_not_submitted() {
        let backend = MockBackend::new();
        let (coordinator, store) = coordinator_with(backend.clone());
        store
            .enqueue_operation(OperationKind::Update, "stuck", json!({}))
            .unwrap();
        for _ in 0..5 {
            store.increment_attempts("stuck").unwrap();
        }
        store
            .enqueue_operation(OperationKind::Create, "fresh", json!({}))
            .unwrap();

        coordinator.sync_now().await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        let submitted: Vec<&str> = requests[0]
            .operations
            .iter()
            .map(|op| op.id.as_str())
            .collect();
        assert_eq!(submitted, vec!["fresh"]);

        // still visible to the user as a stuck item
        let queue = store.list_operations().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "stuck");
        assert_eq!(queue[0].attempts, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_only_queue_makes_no_request() {
        let backend = MockBackend::new();
        let (coordinator, store) = coordinator_with(backend.clone());
        store
            .enqueue_operation(OperationKind::Update, "stuck", json!({}))
            .unwrap();
        for _ in 0..5 {
            store.increment_attempts("stuck").unwrap();
        }

        let outcome = coordinator.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome::default());
        assert!(backend.requests().is_empty());
        assert_eq!(coordinator.phase(), SyncPhase::Idle);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn operations_enqueued_mid_round_wait_for_the_next_trigger() {
        let backend = MockBackend::gated();
        let (coordinator, store) = coordinator_with(backend.clone());
        store
            .enqueue_operation(OperationKind::Create, "m1", json!({}))
            .unwrap();

        let coordinator = Arc::new(coordinator);
        let round = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.sync_now().await }
        });
        while backend.requests().is_empty() {
            tokio::task::yield_now().await;
        }

        // lands while the batch is in flight
        store
            .enqueue_operation(OperationKind::Create, "m2", json!({}))
            .unwrap();
        backend.release();
        round.await.unwrap().unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].operations.len(), 1);

        // not lost, picked up by the next round
        let queue = store.list_operations().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "m2");

        backend.release();
        let next = coordinator.sync_now().await.unwrap();
        assert_eq!(next, SyncOutcome { succeeded: 1, failed: 0 });
        assert!(store.list_operations().unwrap().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ack_for_a_replaced_operation_keeps_the_fresh_intent() {
        let backend = MockBackend::gated();
        let (coordinator, store) = coordinator_with(backend.clone());
        store
            .enqueue_operation(OperationKind::Update, "m1", json!({"goalsFor": 2}))
            .unwrap();

        let coordinator = Arc::new(coordinator);
        let round = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.sync_now().await }
        });
        while backend.requests().is_empty() {
            tokio::task::yield_now().await;
        }

        // replace the queued intent while its predecessor is in flight
        tokio::time::sleep(Duration::from_millis(5)).await;
        let replacement = store
            .enqueue_operation(OperationKind::Update, "m1", json!({"goalsFor": 3}))
            .unwrap();
        backend.release();
        round.await.unwrap().unwrap();

        let queue = store.list_operations().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].payload, json!({"goalsFor": 3}));
        assert_eq!(queue[0].queued_at, replacement.queued_at);
    }

    #[tokio::test(start_paused = true)]
    async fn results_for_unknown_ids_are_ignored() {
        let backend = MockBackend::new();
        backend.push_reply(Ok(SyncResponse {
            success: true,
            results: vec![
                OperationOutcome {
                    id: "m1".to_string(),
                    success: true,
                    result: None,
                },
                OperationOutcome {
                    id: "phantom".to_string(),
                    success: true,
                    result: None,
                },
            ],
            errors: Vec::new(),
            last_sync: None,
            processed_count: 2,
        }));
        let (coordinator, store) = coordinator_with(backend);
        store
            .enqueue_operation(OperationKind::Create, "m1", json!({}))
            .unwrap();

        let outcome = coordinator.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome { succeeded: 1, failed: 0 });
        assert!(store.list_operations().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_round_cancels_the_previous_display_reset() {
        let backend = MockBackend::new();
        backend.push_reply(Err(Error::Api("HTTP 500".to_string())));
        let (coordinator, store) = coordinator_with(backend);
        store
            .enqueue_operation(OperationKind::Create, "m1", json!({}))
            .unwrap();

        coordinator.sync_now().await.unwrap();
        assert_eq!(coordinator.phase(), SyncPhase::Error);

        // second round acks everything before the first reset elapses
        tokio::time::sleep(Duration::from_secs(1)).await;
        coordinator.sync_now().await.unwrap();
        assert_eq!(coordinator.phase(), SyncPhase::Success);

        // the stale timer from round one must not flip this early
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(coordinator.phase(), SyncPhase::Success);

        tokio::time::sleep(DISPLAY * 2).await;
        assert_eq!(coordinator.phase(), SyncPhase::Idle);
    }

    #[test]
    fn wire_shapes_match_the_endpoint_contract() {
        let record = OperationRecord::new(
            OperationKind::Update,
            "m1",
            json!({"goalsFor": 3, "finished": true}),
        );
        let request = SyncRequest {
            operations: vec![OperationDescriptor::from(&record)],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["operations"][0]["type"], "match-update");
        assert!(value["operations"][0]["timestamp"].is_i64());
        assert_eq!(value["operations"][0]["data"]["goalsFor"], 3);

        let raw = json!({
            "success": true,
            "results": [{"id": "m1", "success": true}],
            "errors": [],
            "lastSync": 1_700_000_000_000_i64,
            "processedCount": 1
        });
        let response: SyncResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.processed_count, 1);
        assert_eq!(response.last_sync, Some(1_700_000_000_000));
        assert!(response.results[0].success);
    }
}
