//! touchline-core - Core library for Touchline
//!
//! This crate contains the shared models, the local state store, and the
//! offline sync engine used by all Touchline interfaces. The engine lets
//! a client keep recording match activity while disconnected and drains
//! the queued operations against the backend once connectivity returns.

pub mod connectivity;
pub mod engine;
pub mod error;
pub mod models;
pub mod status;
pub mod store;
pub mod sync;

pub use engine::{EngineConfig, SyncEngine};
pub use error::{Error, Result};
pub use models::{MatchId, MatchRecord, OperationKind, OperationRecord, PlayerLine};
pub use status::{SyncPhase, SyncStatus};
pub use store::{LocalStateStore, StoragePort};
pub use sync::{SyncBackend, SyncCoordinator, SyncOutcome};
