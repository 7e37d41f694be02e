//! Connectivity monitoring
//!
//! The engine never probes the network itself; the host pushes
//! online/offline transitions into the monitor (from the platform's
//! reachability events, a heartbeat, or a manual toggle) and the engine
//! reacts to the edges.

use std::sync::Arc;

use tokio::sync::watch;

/// Tracks whether the client currently has a usable network path.
///
/// Exposes the current boolean plus a change stream. Duplicate pushes of
/// the same state are suppressed so subscribers only wake on real
/// transitions.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    sender: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Current connectivity state
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Push a connectivity transition; a no-op if the state is unchanged
    pub fn set_online(&self, online: bool) {
        self.sender.send_if_modified(|state| {
            if *state == online {
                false
            } else {
                *state = online;
                true
            }
        });
    }

    /// Subscribe to connectivity transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
