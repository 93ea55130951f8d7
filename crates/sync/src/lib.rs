//! Client-side sync engine for fitfind
//!
//! Optimistic list state with exact rollback, retry with backoff, an offline
//! queue replayed on reconnect, undo windows, batched bulk deletion and a
//! typed event bus shared by resource controllers.

#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]

pub mod bulk;
pub mod cancel;
pub mod config;
mod context;
pub mod error;
pub mod events;
pub mod network;
pub mod offline_queue;
pub mod optimistic;
mod outcome;
pub mod queue_store;
mod resilience;
pub mod resources;
pub mod retry;
pub mod stable_fetch;
pub mod undo;

#[cfg(test)]
mod tests;

pub use bulk::{BulkOutcome, BulkStatus, bulk_delete};
pub use cancel::CancelScope;
pub use config::{SyncConfig, default_queue_path};
pub use context::SyncContext;
pub use error::QueueStoreError;
pub use events::{EventBus, ItemEvent, ResourceKind, SyncEvent};
pub use network::NetworkMonitor;
pub use offline_queue::{OfflineQueue, OperationKind, PendingOperation, QueuedMutation};
pub use optimistic::{InsertPosition, OptimisticList, Removal, Rollback};
pub use outcome::OperationOutcome;
pub use queue_store::QueueStore;
pub use resilience::{ReplayReport, Resilience};
pub use resources::{
    CollectionItemsResource, CollectionPlacement, CollectionsResource, EventSink, FetchStatus,
    HistoryFilters, HistoryResource, SaveItemAction, SaveRequest, SaveResult, WishlistFilters,
    WishlistResource, WishlistSort, spawn_event_listener,
};
pub use retry::{RetryPolicy, retry};
pub use stable_fetch::FetchKey;
pub use undo::UndoBuffer;
