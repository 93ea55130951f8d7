use std::sync::Arc;

use tokio::sync::watch;

/// Tracks whether the client believes it can reach the API.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record the connectivity state. Returns `true` if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
