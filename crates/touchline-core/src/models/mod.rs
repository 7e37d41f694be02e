//! Data models shared by the engine and the front ends

pub mod match_record;
pub mod operation;

pub use match_record::{MatchId, MatchRecord, PlayerLine};
pub use operation::{OperationKind, OperationRecord};
