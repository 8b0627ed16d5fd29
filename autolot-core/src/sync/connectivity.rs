//! Online/offline status and transition events.

use std::sync::Arc;
use tokio::sync::watch;

/// Reports whether the remote store is reachable and publishes transitions.
pub trait ConnectivityOracle: Send + Sync {
    fn is_online(&self) -> bool;

    /// Receiver that observes every change of the online flag.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity flag set by the host from its own network signal.
///
/// Clones share the same flag. Only real transitions notify subscribers.
#[derive(Clone)]
pub struct NetworkStatus {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Record the current status. Returns true when this was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::debug!(online, "Connectivity changed");
        }
        changed
    }
}

impl ConnectivityOracle for NetworkStatus {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
