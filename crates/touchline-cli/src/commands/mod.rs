pub mod add;
pub mod common;
pub mod queue;
pub mod snapshot;
pub mod status;
pub mod sync;
pub mod update;
