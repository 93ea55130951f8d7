use std::sync::Arc;

use fitfind_core::FitFindApi;

use crate::config::SyncConfig;
use crate::error::QueueStoreError;
use crate::events::EventBus;
use crate::network::NetworkMonitor;
use crate::offline_queue::OfflineQueue;
use crate::queue_store::QueueStore;
use crate::resilience::Resilience;

/// Everything a resource needs: the API, the resilience helper and settings.
///
/// Clones share the same queue, event bus and connectivity state.
#[derive(Clone)]
pub struct SyncContext {
    pub api: Arc<dyn FitFindApi>,
    pub resilience: Arc<Resilience>,
    pub config: SyncConfig,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("resilience", &self.resilience)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    /// Build a context, loading the offline queue from `config.queue_path` if set.
    ///
    /// # Errors
    /// Returns an error if an existing queue file cannot be read or parsed.
    pub fn new(api: Arc<dyn FitFindApi>, config: SyncConfig) -> Result<Self, QueueStoreError> {
        let queue = match &config.queue_path {
            Some(path) => OfflineQueue::persistent(QueueStore::new(path))?,
            None => OfflineQueue::in_memory(),
        };
        Ok(Self::with_parts(api, config, Arc::new(queue), NetworkMonitor::default()))
    }

    #[must_use]
    pub fn with_parts(
        api: Arc<dyn FitFindApi>,
        config: SyncConfig,
        queue: Arc<OfflineQueue>,
        monitor: NetworkMonitor,
    ) -> Self {
        let resilience = Arc::new(Resilience::new(&config, queue, EventBus::new(), monitor));
        Self { api, resilience, config }
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        self.resilience.events()
    }

    #[must_use]
    pub fn queue(&self) -> &Arc<OfflineQueue> {
        self.resilience.queue()
    }
}
