//! Cross-resource notifications.
//!
//! Resources publish what they changed; other resources mirror the change
//! in their own lists. Every event carries the publishing resource's origin
//! id so a resource can ignore its own events.

use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    History,
    Wishlist,
    Collections,
    CollectionItems,
}

impl ResourceKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::History => "history",
            Self::Wishlist => "wishlist",
            Self::Collections => "collections",
            Self::CollectionItems => "collection_items",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEvent {
    pub resource: ResourceKind,
    /// Identity of the item within its resource.
    pub id: String,
    /// Owning collection, for collection items.
    pub parent_id: Option<String>,
    pub origin: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ItemAdded(ItemEvent),
    ItemDeleted(ItemEvent),
    ItemRestored(ItemEvent),
    OperationQueued { operation_id: Uuid, description: String },
    /// A queued operation was discarded during replay.
    OperationDropped { operation_id: Uuid, description: String, error: String },
    Connectivity { online: bool },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Send to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: SyncEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("sync event published with no subscribers");
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
