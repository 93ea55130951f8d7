use fitfind_core::{FitFindError, NewWishlistItem, PageRequest, WishlistItem};
use fitfind_core::constants::MAX_PAGE_SIZE;
use uuid::Uuid;

use crate::context::SyncContext;
use crate::events::{ItemEvent, ResourceKind, SyncEvent};
use crate::offline_queue::QueuedMutation;
use crate::outcome::OperationOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub product_id: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    /// Also place the saved item in this collection.
    pub collection_id: Option<String>,
}

impl SaveRequest {
    #[must_use]
    pub fn new(product_id: impl Into<String>) -> Self {
        Self { product_id: product_id.into(), notes: None, tags: Vec::new(), collection_id: None }
    }

    #[must_use]
    pub fn into_collection(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }
}

/// What happened to the collection part of a save.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionPlacement {
    NotRequested,
    Added,
    AlreadyPresent,
    Queued(Uuid),
    /// The wishlist save went through but the collection add did not.
    Failed(FitFindError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveResult {
    /// `None` only when the product was already saved and could not be found
    /// on the first wishlist page.
    pub wishlist_item: Option<WishlistItem>,
    pub already_saved: bool,
    pub collection: CollectionPlacement,
}

/// Save a product to the wishlist and optionally into a collection.
pub struct SaveItemAction {
    ctx: SyncContext,
    origin: Uuid,
}

impl SaveItemAction {
    #[must_use]
    pub fn new(ctx: &SyncContext) -> Self {
        Self { ctx: ctx.clone(), origin: Uuid::new_v4() }
    }

    fn publish_added(&self, resource: ResourceKind, id: &str, parent_id: Option<&str>) {
        self.ctx.events().publish(SyncEvent::ItemAdded(ItemEvent {
            resource,
            id: id.to_owned(),
            parent_id: parent_id.map(str::to_owned),
            origin: self.origin,
        }));
    }

    /// Save `request.product_id`. An "already saved" conflict is not a failure.
    ///
    /// While offline the wishlist add is queued and the collection step is skipped.
    pub async fn save(&self, request: SaveRequest) -> OperationOutcome<SaveResult> {
        let new_item = NewWishlistItem {
            product_id: request.product_id.clone(),
            notes: request.notes.clone(),
            tags: request.tags.clone(),
        };
        let api = &self.ctx.api;
        let resilience = &self.ctx.resilience;

        let outcome = resilience
            .execute_or_queue(
                "save item",
                QueuedMutation::AddToWishlist { item: new_item.clone() },
                || api.add_to_wishlist(&new_item),
            )
            .await;

        let (wishlist_item, already_saved) = match outcome {
            OperationOutcome::Success(item) => {
                self.publish_added(ResourceKind::Wishlist, &item.id, None);
                (Some(item), false)
            },
            OperationOutcome::Failed(err) if err.is_conflict() => {
                tracing::debug!(product_id = %request.product_id, "product already saved");
                (self.find_saved(&request.product_id).await, true)
            },
            OperationOutcome::Failed(err) => return OperationOutcome::Failed(err),
            OperationOutcome::Queued(id) => return OperationOutcome::Queued(id),
        };

        let collection = match (&request.collection_id, &wishlist_item) {
            (None, _) => CollectionPlacement::NotRequested,
            (Some(_), None) => CollectionPlacement::Failed(FitFindError::NotFound(
                "Saved item not found".to_owned(),
            )),
            (Some(collection_id), Some(item)) => {
                self.place_in_collection(collection_id, &item.id).await
            },
        };

        OperationOutcome::Success(SaveResult { wishlist_item, already_saved, collection })
    }

    async fn place_in_collection(
        &self,
        collection_id: &str,
        saved_item_id: &str,
    ) -> CollectionPlacement {
        let api = &self.ctx.api;
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "add saved item to collection",
                QueuedMutation::AddCollectionItem {
                    collection_id: collection_id.to_owned(),
                    saved_item_id: saved_item_id.to_owned(),
                },
                || api.add_collection_item(collection_id, saved_item_id),
            )
            .await;
        match outcome {
            OperationOutcome::Success(()) => {
                self.publish_added(ResourceKind::CollectionItems, saved_item_id, Some(collection_id));
                CollectionPlacement::Added
            },
            OperationOutcome::Failed(err) if err.is_conflict() => CollectionPlacement::AlreadyPresent,
            OperationOutcome::Failed(err) => {
                tracing::warn!(collection_id, error = %err, "saved item not added to collection");
                CollectionPlacement::Failed(err)
            },
            OperationOutcome::Queued(id) => CollectionPlacement::Queued(id),
        }
    }

    async fn find_saved(&self, product_id: &str) -> Option<WishlistItem> {
        let api = &self.ctx.api;
        let page = self
            .ctx
            .resilience
            .execute("look up saved item", || api.list_wishlist(PageRequest::first(MAX_PAGE_SIZE)))
            .await;
        match page {
            Ok(page) => page.items.into_iter().find(|item| item.product_id == product_id),
            Err(err) => {
                tracing::warn!(product_id, error = %err, "could not look up saved item");
                None
            },
        }
    }
}
