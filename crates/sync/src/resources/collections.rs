use fitfind_core::{
    Collection, CollectionUpdate, FitFindError, NewCollection, Pagination, pending_id,
};
use uuid::Uuid;

use super::{EventSink, FetchStatus, ResourceCore};
use crate::cancel::CancelScope;
use crate::context::SyncContext;
use crate::events::{ResourceKind, SyncEvent};
use crate::offline_queue::QueuedMutation;
use crate::optimistic::InsertPosition;
use crate::outcome::OperationOutcome;

/// The user's collections.
///
/// Item counts follow membership changes published by collection item views.
pub struct CollectionsResource {
    ctx: SyncContext,
    core: ResourceCore<Collection, ()>,
}

impl CollectionsResource {
    #[must_use]
    pub fn new(ctx: &SyncContext) -> Self {
        let core = ResourceCore::new(ResourceKind::Collections, &ctx.config, ctx.events().clone());
        Self { ctx: ctx.clone(), core }
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
        self.core
            .fetch(append, |page| async move {
                resilience.execute("fetch collections", || api.list_collections(page)).await
            })
            .await
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Collection> {
        self.core.with_state(|s| s.list.get(id).cloned())
    }

    /// Create a collection, shown first in the list while the request runs.
    pub async fn create(&self, request: NewCollection) -> OperationOutcome<Collection> {
        let request = match request.validated() {
            Ok(request) => request,
            Err(err) => return OperationOutcome::Failed(err),
        };

        let placeholder_id = pending_id(&Uuid::new_v4().to_string());
        let placeholder = Collection::placeholder(placeholder_id.clone(), &request);
        let rollback = self.core.with_state(|s| s.list.add(placeholder, InsertPosition::Prepend));

        let api = &self.ctx.api;
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "create collection",
                QueuedMutation::CreateCollection { collection: request.clone() },
                || api.create_collection(&request),
            )
            .await;
        if self.core.is_closed() {
            return outcome;
        }

        match &outcome {
            OperationOutcome::Success(collection) => {
                self.core.with_state(|s| {
                    s.list.confirm_add(&placeholder_id, collection.clone(), InsertPosition::Prepend);
                });
                self.core.clear_error();
                self.core.publish(SyncEvent::ItemAdded(self.core.item_event(&collection.id, None)));
            },
            OperationOutcome::Queued(_) => self.core.clear_error(),
            OperationOutcome::Failed(err) => {
                self.core.with_state(|s| s.list.rollback(rollback));
                self.core.record_failure("create", err);
            },
        }
        outcome
    }

    /// Apply `updates` locally, then on the server; failure restores the
    /// previous record.
    pub async fn update(&self, id: &str, updates: CollectionUpdate) -> OperationOutcome<Collection> {
        if updates.is_empty() {
            return OperationOutcome::Failed(FitFindError::Validation(
                "No updates provided".to_owned(),
            ));
        }
        if let Some(name) = &updates.name {
            if let Err(err) = NewCollection::new(name.as_str()).validated() {
                return OperationOutcome::Failed(err);
            }
        }
        let rollback = self.core.with_state(|s| {
            let updated = s.list.get(id)?.with_updates(&updates);
            s.list.replace(id, updated)
        });
        let Some(rollback) = rollback else {
            return OperationOutcome::Failed(FitFindError::NotFound(
                "Collection not found".to_owned(),
            ));
        };

        let api = &self.ctx.api;
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "update collection",
                QueuedMutation::UpdateCollection { id: id.to_owned(), updates: updates.clone() },
                || api.update_collection(id, &updates),
            )
            .await;
        if self.core.is_closed() {
            return outcome;
        }

        match &outcome {
            OperationOutcome::Success(collection) => {
                self.core.with_state(|s| s.list.replace(id, collection.clone()));
                self.core.clear_error();
            },
            OperationOutcome::Queued(_) => self.core.clear_error(),
            OperationOutcome::Failed(err) => {
                self.core.with_state(|s| s.list.rollback(rollback));
                self.core.record_failure("update", err);
            },
        }
        outcome
    }

    /// Delete a collection. The default collection is refused locally.
    pub async fn delete(&self, id: &str) -> OperationOutcome<()> {
        let Some(collection) = self.get(id) else {
            return OperationOutcome::Failed(FitFindError::NotFound(
                "Collection not found".to_owned(),
            ));
        };
        if collection.is_default() {
            let err = FitFindError::Validation("Cannot delete default collection".to_owned());
            self.core.with_state(|s| s.error = Some(err.user_message()));
            return OperationOutcome::Failed(err);
        }
        let Some(removal) = self.core.with_state(|s| s.list.remove(id)) else {
            return OperationOutcome::Failed(FitFindError::NotFound(
                "Collection not found".to_owned(),
            ));
        };

        let api = &self.ctx.api;
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "delete collection",
                QueuedMutation::DeleteCollection { id: id.to_owned() },
                || api.delete_collection(id),
            )
            .await;
        if self.core.is_closed() {
            return outcome;
        }

        match &outcome {
            OperationOutcome::Success(()) => {
                self.core.clear_error();
                self.core.publish(SyncEvent::ItemDeleted(self.core.item_event(id, None)));
            },
            OperationOutcome::Queued(_) => self.core.clear_error(),
            OperationOutcome::Failed(err) => {
                self.core.with_state(|s| s.list.restore(removal));
                self.core.record_failure("delete", err);
            },
        }
        outcome
    }

    fn adjust_item_count(&self, collection_id: &str, added: bool) {
        self.core.with_state(|s| {
            let Some(index) = s.list.position(collection_id) else {
                return;
            };
            let collection = &mut s.list.items_mut()[index];
            collection.item_count = if added {
                collection.item_count.saturating_add(1)
            } else {
                collection.item_count.saturating_sub(1)
            };
        });
    }

    #[must_use]
    pub fn items(&self) -> Vec<Collection> {
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

    pub fn close(&self) {
        self.core.close();
    }
}

impl EventSink for CollectionsResource {
    fn apply_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::ItemAdded(item) | SyncEvent::ItemRestored(item)
                if item.resource == ResourceKind::CollectionItems =>
            {
                if let Some(collection_id) = &item.parent_id {
                    self.adjust_item_count(collection_id, true);
                }
            },
            SyncEvent::ItemDeleted(item) if item.resource == ResourceKind::CollectionItems => {
                if let Some(collection_id) = &item.parent_id {
                    self.adjust_item_count(collection_id, false);
                }
            },
            SyncEvent::ItemDeleted(item)
                if item.resource == ResourceKind::Collections && !self.core.is_own(item) =>
            {
                self.core.with_state(|s| s.list.remove(&item.id));
            },
            SyncEvent::ItemAdded(item)
                if item.resource == ResourceKind::Collections && !self.core.is_own(item) =>
            {
                self.core.mark_needs_refresh();
            },
            _ => {},
        }
    }

    fn scope(&self) -> &CancelScope {
        self.core.scope()
    }
}
