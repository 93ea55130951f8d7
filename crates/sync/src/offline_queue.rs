//! Operations held while the client is offline.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use fitfind_core::{
    CollectionUpdate, FitFindApi, FitFindError, ItemPosition, NewCollection, NewWishlistItem,
    WishlistUpdate,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QueueStoreError;
use crate::queue_store::QueueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Remove,
    Reorder,
    Update,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Reorder => "reorder",
            Self::Update => "update",
        }
    }
}

/// A mutation described as data, so it can be replayed and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueuedMutation {
    AddToWishlist { item: NewWishlistItem },
    RemoveFromWishlist { product_id: String },
    UpdateWishlistItem { id: String, updates: WishlistUpdate },
    DeleteHistoryEntry { id: String },
    RestoreHistoryEntry { id: String },
    CreateCollection { collection: NewCollection },
    UpdateCollection { id: String, updates: CollectionUpdate },
    DeleteCollection { id: String },
    AddCollectionItem { collection_id: String, saved_item_id: String },
    RemoveCollectionItem { collection_id: String, saved_item_id: String },
    ReorderCollectionItems { collection_id: String, positions: Vec<ItemPosition> },
}

impl QueuedMutation {
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::AddToWishlist { .. }
            | Self::RestoreHistoryEntry { .. }
            | Self::CreateCollection { .. }
            | Self::AddCollectionItem { .. } => OperationKind::Add,
            Self::RemoveFromWishlist { .. }
            | Self::DeleteHistoryEntry { .. }
            | Self::DeleteCollection { .. }
            | Self::RemoveCollectionItem { .. } => OperationKind::Remove,
            Self::ReorderCollectionItems { .. } => OperationKind::Reorder,
            Self::UpdateWishlistItem { .. } | Self::UpdateCollection { .. } => {
                OperationKind::Update
            },
        }
    }

    /// Id of the item the mutation acts on.
    #[must_use]
    pub fn target_id(&self) -> &str {
        match self {
            Self::AddToWishlist { item } => &item.product_id,
            Self::RemoveFromWishlist { product_id } => product_id,
            Self::CreateCollection { collection } => &collection.name,
            Self::ReorderCollectionItems { collection_id, .. } => collection_id,
            Self::AddCollectionItem { saved_item_id, .. }
            | Self::RemoveCollectionItem { saved_item_id, .. } => saved_item_id,
            Self::UpdateWishlistItem { id, .. }
            | Self::DeleteHistoryEntry { id }
            | Self::RestoreHistoryEntry { id }
            | Self::UpdateCollection { id, .. }
            | Self::DeleteCollection { id } => id,
        }
    }

    /// Whether `err` means the server already holds the mutation's result:
    /// an add that conflicts, or a removal of something already gone.
    #[must_use]
    pub fn is_already_applied(&self, err: &FitFindError) -> bool {
        match self.kind() {
            OperationKind::Add => {
                err.is_conflict() && !matches!(self, Self::RestoreHistoryEntry { .. })
            },
            OperationKind::Remove => err.is_not_found(),
            OperationKind::Reorder | OperationKind::Update => false,
        }
    }

    /// Perform the mutation against the API once.
    ///
    /// # Errors
    /// Returns the API error unchanged.
    pub async fn apply(&self, api: &dyn FitFindApi) -> Result<(), FitFindError> {
        match self {
            Self::AddToWishlist { item } => api.add_to_wishlist(item).await.map(drop),
            Self::RemoveFromWishlist { product_id } => api.remove_from_wishlist(product_id).await,
            Self::UpdateWishlistItem { id, updates } => {
                api.update_wishlist_item(id, updates).await.map(drop)
            },
            Self::DeleteHistoryEntry { id } => api.delete_history_entry(id).await,
            Self::RestoreHistoryEntry { id } => api.restore_history_entry(id).await,
            Self::CreateCollection { collection } => {
                api.create_collection(collection).await.map(drop)
            },
            Self::UpdateCollection { id, updates } => {
                api.update_collection(id, updates).await.map(drop)
            },
            Self::DeleteCollection { id } => api.delete_collection(id).await,
            Self::AddCollectionItem { collection_id, saved_item_id } => {
                api.add_collection_item(collection_id, saved_item_id).await
            },
            Self::RemoveCollectionItem { collection_id, saved_item_id } => {
                api.remove_collection_item(collection_id, saved_item_id).await
            },
            Self::ReorderCollectionItems { collection_id, positions } => {
                api.reorder_collection_items(collection_id, positions).await
            },
        }
    }
}

/// An operation waiting in the offline queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub id: Uuid,
    pub target_id: String,
    pub kind: OperationKind,
    pub retry_count: u32,
    pub max_retries: u32,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub mutation: QueuedMutation,
}

impl PendingOperation {
    #[must_use]
    pub fn new(description: impl Into<String>, mutation: QueuedMutation, max_retries: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_id: mutation.target_id().to_owned(),
            kind: mutation.kind(),
            retry_count: 0,
            max_retries,
            timestamp: Utc::now(),
            description: description.into(),
            mutation,
        }
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// FIFO of pending operations, optionally mirrored to a [`QueueStore`].
#[derive(Debug, Default)]
pub struct OfflineQueue {
    ops: Mutex<VecDeque<PendingOperation>>,
    store: Option<QueueStore>,
}

impl OfflineQueue {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Queue backed by `store`, seeded with whatever it already holds.
    ///
    /// # Errors
    /// Returns the load error for a file that is unreadable or not a queue,
    /// leaving the file untouched.
    pub fn persistent(store: QueueStore) -> Result<Self, QueueStoreError> {
        let ops = store.load()?;
        if !ops.is_empty() {
            tracing::info!(count = ops.len(), "loaded offline queue");
        }
        Ok(Self { ops: Mutex::new(ops.into()), store: Some(store) })
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingOperation>> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, ops: &VecDeque<PendingOperation>) {
        if let Some(store) = &self.store {
            let snapshot: Vec<PendingOperation> = ops.iter().cloned().collect();
            if let Err(e) = store.save(&snapshot) {
                tracing::warn!(error = %e, "failed to persist offline queue");
            }
        }
    }

    pub fn push(&self, op: PendingOperation) {
        let mut ops = self.lock();
        ops.push_back(op);
        self.persist(&ops);
    }

    /// Drop the operation with `id`. Returns `false` if it is no longer queued.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut ops = self.lock();
        let Some(index) = ops.iter().position(|op| op.id == id) else {
            return false;
        };
        ops.remove(index);
        self.persist(&ops);
        true
    }

    /// Replace the queued copy of `op` in place, keeping its position.
    pub fn update(&self, op: &PendingOperation) -> bool {
        let mut ops = self.lock();
        let Some(slot) = ops.iter_mut().find(|queued| queued.id == op.id) else {
            return false;
        };
        *slot = op.clone();
        self.persist(&ops);
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<PendingOperation> {
        self.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop everything. Returns how many operations were discarded.
    pub fn clear(&self) -> usize {
        let mut ops = self.lock();
        let count = ops.len();
        ops.clear();
        self.persist(&ops);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: &str) -> PendingOperation {
        PendingOperation::new(
            format!("delete {id}"),
            QueuedMutation::DeleteHistoryEntry { id: id.to_owned() },
            3,
        )
    }

    #[test]
    fn test_pending_operation_derives_target_and_kind() {
        let op = PendingOperation::new(
            "add",
            QueuedMutation::AddCollectionItem {
                collection_id: "c1".to_owned(),
                saved_item_id: "w1".to_owned(),
            },
            3,
        );
        assert_eq!(op.target_id, "w1");
        assert_eq!(op.kind, OperationKind::Add);
        assert!(!op.is_exhausted());
    }

    #[test]
    fn test_update_and_remove_keep_order() {
        let queue = OfflineQueue::in_memory();
        queue.push(op("a"));
        queue.push(op("b"));
        queue.push(op("c"));
        let mut first = queue.snapshot().remove(0);
        first.retry_count = 2;

        assert!(queue.update(&first));
        assert!(queue.remove(queue.snapshot()[1].id));
        assert!(!queue.remove(Uuid::new_v4()));

        let queued = queue.snapshot();
        let order: Vec<&str> = queued.iter().map(|o| o.target_id.as_str()).collect();
        assert_eq!(order, ["a", "c"]);
        assert_eq!(queued[0].retry_count, 2);
    }

    #[test]
    fn test_mutation_serializes_tagged() {
        let json = serde_json::to_value(QueuedMutation::RemoveFromWishlist {
            product_id: "p1".to_owned(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "remove_from_wishlist", "product_id": "p1"}));
    }

    #[test]
    fn test_already_applied_by_kind() {
        let add = QueuedMutation::AddToWishlist { item: NewWishlistItem::new("p1") };
        let remove = QueuedMutation::RemoveFromWishlist { product_id: "p1".to_owned() };
        let conflict = FitFindError::Conflict("Item already in wishlist".to_owned());
        let missing = FitFindError::NotFound("gone".to_owned());
        assert!(add.is_already_applied(&conflict));
        assert!(!add.is_already_applied(&missing));
        assert!(remove.is_already_applied(&missing));
        assert!(!remove.is_already_applied(&conflict));
    }

    #[test]
    fn test_clear_reports_count() {
        let queue = OfflineQueue::in_memory();
        queue.push(op("a"));
        queue.push(op("b"));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }
}
