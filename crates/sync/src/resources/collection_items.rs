use std::sync::Arc;

use fitfind_core::{
    CollectionItem, FitFindError, ItemPosition, Pagination, WishlistItem, pending_id,
};
use uuid::Uuid;

use super::{EventSink, FetchStatus, ResourceCore};
use crate::cancel::CancelScope;
use crate::context::SyncContext;
use crate::events::{ResourceKind, SyncEvent};
use crate::offline_queue::QueuedMutation;
use crate::optimistic::{InsertPosition, Removal};
use crate::outcome::OperationOutcome;

/// Items of one collection, in their saved order.
///
/// Items are keyed by `saved_item_id`. Removals wait out the undo window
/// before reaching the server, like wishlist removals.
pub struct CollectionItemsResource {
    ctx: SyncContext,
    collection_id: String,
    core: Arc<ResourceCore<CollectionItem, ()>>,
}

impl CollectionItemsResource {
    #[must_use]
    pub fn new(ctx: &SyncContext, collection_id: impl Into<String>) -> Self {
        let core =
            ResourceCore::new(ResourceKind::CollectionItems, &ctx.config, ctx.events().clone());
        Self { ctx: ctx.clone(), collection_id: collection_id.into(), core: Arc::new(core) }
    }

    #[must_use]
    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// # Errors
    /// Returns the fetch error, which is also stored for display.
    pub async fn fetch(&self) -> Result<FetchStatus, FitFindError> {
        self.fetch_page(false).await
    }

    /// # Errors
    /// Returns the fetch error, which is also stored for display.
    pub async fn load_more(&self) -> Result<FetchStatus, FitFindError> {
        self.fetch_page(true).await
    }

    async fn fetch_page(&self, append: bool) -> Result<FetchStatus, FitFindError> {
        let api = &self.ctx.api;
        let resilience = &self.ctx.resilience;
        let collection_id = self.collection_id.as_str();
        self.core
            .fetch(append, |page| async move {
                resilience
                    .execute("fetch collection items", || {
                        api.list_collection_items(collection_id, page)
                    })
                    .await
            })
            .await
    }

    #[must_use]
    pub fn contains(&self, saved_item_id: &str) -> bool {
        self.core.with_state(|s| s.list.contains(saved_item_id))
    }

    /// Append a saved item at the end of the collection.
    ///
    /// Adding an item whose removal is still held cancels the removal.
    pub async fn add(
        &self,
        saved_item_id: &str,
        saved_item: Option<WishlistItem>,
    ) -> OperationOutcome<CollectionItem> {
        if let Some(removal) = self.core.discard_undo(saved_item_id) {
            let item = removal.item.clone();
            self.core.with_state(|s| s.list.restore(removal));
            tracing::debug!(saved_item_id, "held removal cancelled by add");
            return OperationOutcome::Success(item);
        }
        if self.contains(saved_item_id) {
            return OperationOutcome::Failed(FitFindError::Conflict(
                "Item already in collection".to_owned(),
            ));
        }

        let item = self.core.with_state(|s| {
            let position = s.list.items().iter().map(|i| i.position).max().unwrap_or(0) + 1;
            CollectionItem::placeholder(
                pending_id(&Uuid::new_v4().to_string()),
                &self.collection_id,
                saved_item_id,
                position,
                saved_item,
            )
        });
        let rollback = self.core.with_state(|s| s.list.add(item.clone(), InsertPosition::Append));

        let api = &self.ctx.api;
        let collection_id = self.collection_id.as_str();
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "add item to collection",
                QueuedMutation::AddCollectionItem {
                    collection_id: collection_id.to_owned(),
                    saved_item_id: saved_item_id.to_owned(),
                },
                || api.add_collection_item(collection_id, saved_item_id),
            )
            .await;
        if self.core.is_closed() {
            return outcome.map(|()| item);
        }

        match &outcome {
            OperationOutcome::Success(()) => {
                self.core.with_state(|s| {
                    s.list.confirm_add(saved_item_id, item.clone(), InsertPosition::Append);
                });
                self.core.clear_error();
                let event = self.core.item_event(saved_item_id, Some(collection_id));
                self.core.publish(SyncEvent::ItemAdded(event));
            },
            OperationOutcome::Queued(_) => self.core.clear_error(),
            OperationOutcome::Failed(err) => {
                self.core.with_state(|s| s.list.rollback(rollback));
                self.core.record_failure("add", err);
            },
        }
        outcome.map(|()| item)
    }

    /// Remove a saved item from the collection, held for undo when enabled.
    pub async fn remove(&self, saved_item_id: &str) -> OperationOutcome<()> {
        let Some(removal) = self.core.with_state(|s| s.list.remove(saved_item_id)) else {
            return OperationOutcome::Failed(FitFindError::NotFound(
                "Item not found in collection".to_owned(),
            ));
        };
        if self.core.undo_enabled() {
            self.core.push_undo(saved_item_id, removal);
            let ctx = self.ctx.clone();
            let core = Arc::clone(&self.core);
            let collection_id = self.collection_id.clone();
            let id = saved_item_id.to_owned();
            self.core.schedule_commit(saved_item_id, move |removal| async move {
                send_removal(&ctx, &core, &collection_id, &id, removal).await;
            });
            tracing::debug!(saved_item_id, "collection item removal held for undo");
            return OperationOutcome::Success(());
        }
        send_removal(&self.ctx, &self.core, &self.collection_id, saved_item_id, removal).await
    }

    /// Returns `false` once the undo window has closed.
    pub fn undo_remove(&self, saved_item_id: &str) -> bool {
        let Some(removal) = self.core.take_undo(saved_item_id) else {
            return false;
        };
        self.core.with_state(|s| s.list.restore(removal));
        true
    }

    #[must_use]
    pub fn can_undo(&self, saved_item_id: &str) -> bool {
        self.core.can_undo(saved_item_id)
    }

    pub async fn commit(&self, saved_item_id: &str) -> Option<OperationOutcome<()>> {
        let removal = self.core.discard_undo(saved_item_id)?;
        Some(send_removal(&self.ctx, &self.core, &self.collection_id, saved_item_id, removal).await)
    }

    /// Send every removal whose undo window has closed. Returns how many were sent.
    pub async fn commit_expired(&self) -> usize {
        let expired = self.core.take_expired_undo();
        let count = expired.len();
        for (saved_item_id, removal) in expired {
            send_removal(&self.ctx, &self.core, &self.collection_id, &saved_item_id, removal)
                .await;
        }
        count
    }

    pub async fn flush(&self) -> usize {
        let pending = self.core.drain_undo();
        let count = pending.len();
        for (saved_item_id, removal) in pending {
            send_removal(&self.ctx, &self.core, &self.collection_id, &saved_item_id, removal)
                .await;
        }
        count
    }

    /// Put the items in the order of `saved_item_ids` and renumber them 1..n.
    ///
    /// On failure the whole previous order comes back.
    pub async fn reorder(&self, saved_item_ids: &[String]) -> OperationOutcome<()> {
        let applied = self.core.with_state(|s| {
            let rollback = s.list.reorder(saved_item_ids)?;
            let mut positions = Vec::with_capacity(saved_item_ids.len());
            for (index, item) in s.list.items_mut().iter_mut().enumerate() {
                item.position = i64::try_from(index + 1).unwrap_or(i64::MAX);
                positions.push(ItemPosition {
                    saved_item_id: item.saved_item_id.clone(),
                    position: item.position,
                });
            }
            Ok::<_, FitFindError>((rollback, positions))
        });
        let (rollback, positions) = match applied {
            Ok(applied) => applied,
            Err(err) => return OperationOutcome::Failed(err),
        };

        let api = &self.ctx.api;
        let collection_id = self.collection_id.as_str();
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "reorder collection items",
                QueuedMutation::ReorderCollectionItems {
                    collection_id: collection_id.to_owned(),
                    positions: positions.clone(),
                },
                || api.reorder_collection_items(collection_id, &positions),
            )
            .await;
        if self.core.is_closed() {
            return outcome;
        }

        match &outcome {
            OperationOutcome::Failed(err) => {
                self.core.with_state(|s| s.list.rollback(rollback));
                self.core.record_failure("reorder", err);
            },
            OperationOutcome::Success(()) | OperationOutcome::Queued(_) => self.core.clear_error(),
        }
        outcome
    }

    /// Move one item to `to_index` (clamped) and reorder.
    pub async fn move_item(&self, saved_item_id: &str, to_index: usize) -> OperationOutcome<()> {
        let order = self.core.with_state(|s| {
            let mut order: Vec<String> =
                s.list.items().iter().map(|i| i.saved_item_id.clone()).collect();
            let from = order.iter().position(|id| id == saved_item_id)?;
            let id = order.remove(from);
            order.insert(to_index.min(order.len()), id);
            Some(order)
        });
        match order {
            Some(order) => self.reorder(&order).await,
            None => OperationOutcome::Failed(FitFindError::NotFound(
                "Item not found in collection".to_owned(),
            )),
        }
    }

    #[must_use]
    pub fn items(&self) -> Vec<CollectionItem> {
        self.core.items()
    }

    #[must_use]
    pub fn pagination(&self) -> Pagination {
        self.core.pagination()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.core.error()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.core.is_loading()
    }

    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.core.needs_refresh()
    }

    /// Stop updating local state. Removals still held for undo are sent,
    /// or queued when no runtime is available to send them on.
    pub fn close(&self) {
        let held = self.core.close_taking_held();
        if held.is_empty() {
            return;
        }
        tracing::debug!(count = held.len(), "sending held collection item removals on close");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let ctx = self.ctx.clone();
            let core = Arc::clone(&self.core);
            let collection_id = self.collection_id.clone();
            handle.spawn(async move {
                for (saved_item_id, removal) in held {
                    send_removal(&ctx, &core, &collection_id, &saved_item_id, removal).await;
                }
            });
        } else {
            for (saved_item_id, _) in held {
                self.ctx.resilience.enqueue(
                    "remove item from collection",
                    removal_mutation(&self.collection_id, &saved_item_id),
                );
            }
        }
    }
}

fn removal_mutation(collection_id: &str, saved_item_id: &str) -> QueuedMutation {
    QueuedMutation::RemoveCollectionItem {
        collection_id: collection_id.to_owned(),
        saved_item_id: saved_item_id.to_owned(),
    }
}

/// Delete an item from a collection on the server, restoring it locally on
/// failure. The deletion is published even after the resource closed.
async fn send_removal(
    ctx: &SyncContext,
    core: &ResourceCore<CollectionItem, ()>,
    collection_id: &str,
    saved_item_id: &str,
    removal: Removal<CollectionItem>,
) -> OperationOutcome<()> {
    let api = &ctx.api;
    let outcome = ctx
        .resilience
        .execute_or_queue(
            "remove item from collection",
            removal_mutation(collection_id, saved_item_id),
            || api.remove_collection_item(collection_id, saved_item_id),
        )
        .await;
    if outcome.is_success() {
        let event = core.item_event(saved_item_id, Some(collection_id));
        core.publish(SyncEvent::ItemDeleted(event));
    }
    if core.is_closed() {
        if let OperationOutcome::Failed(err) = &outcome {
            tracing::warn!(saved_item_id, error = %err, "collection item removal failed after close");
        }
        return outcome;
    }

    match &outcome {
        OperationOutcome::Failed(err) => {
            core.with_state(|s| s.list.restore(removal));
            core.record_failure("remove", err);
        },
        OperationOutcome::Success(()) | OperationOutcome::Queued(_) => core.clear_error(),
    }
    outcome
}

impl EventSink for CollectionItemsResource {
    fn apply_event(&self, event: &SyncEvent) {
        let same_collection =
            |parent: &Option<String>| parent.as_deref() == Some(self.collection_id.as_str());
        match event {
            // Removing a saved item also drops it from every collection.
            SyncEvent::ItemDeleted(item) if item.resource == ResourceKind::Wishlist => {
                self.core.with_state(|s| s.list.remove(&item.id));
            },
            SyncEvent::ItemDeleted(item)
                if item.resource == ResourceKind::CollectionItems
                    && !self.core.is_own(item)
                    && same_collection(&item.parent_id) =>
            {
                self.core.with_state(|s| s.list.remove(&item.id));
            },
            SyncEvent::ItemAdded(item) | SyncEvent::ItemRestored(item)
                if item.resource == ResourceKind::CollectionItems
                    && !self.core.is_own(item)
                    && same_collection(&item.parent_id) =>
            {
                self.core.mark_needs_refresh();
            },
            SyncEvent::ItemDeleted(item)
                if item.resource == ResourceKind::Collections && item.id == self.collection_id =>
            {
                self.core.with_state(|s| {
                    s.list.replace_page(Vec::new(), Pagination::empty(s.list.pagination().limit));
                });
            },
            _ => {},
        }
    }

    fn scope(&self) -> &CancelScope {
        self.core.scope()
    }
}
