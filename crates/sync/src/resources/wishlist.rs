use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use fitfind_core::{
    FitFindError, Identified, NewWishlistItem, Pagination, Product, WishlistItem, WishlistUpdate,
    pending_id,
};
use uuid::Uuid;

use super::{EventSink, FetchStatus, ResourceCore};
use crate::bulk::{BulkOutcome, bulk_delete};
use crate::cancel::CancelScope;
use crate::context::SyncContext;
use crate::events::{ResourceKind, SyncEvent};
use crate::offline_queue::QueuedMutation;
use crate::optimistic::{InsertPosition, Removal};
use crate::outcome::OperationOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WishlistSort {
    #[default]
    Recent,
    Oldest,
    PriceLowHigh,
    PriceHighLow,
    Title,
}

/// Local view options. Changing them never hits the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistFilters {
    /// Case-insensitive match on title, notes or tags.
    pub search: Option<String>,
    pub tag: Option<String>,
    pub sort: WishlistSort,
}

impl WishlistFilters {
    fn matches(&self, item: &WishlistItem) -> bool {
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.is_empty()) {
            if !item.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        item.title().to_lowercase().contains(&needle)
            || item.notes.as_deref().is_some_and(|n| n.to_lowercase().contains(&needle))
            || item.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    fn compare(&self, a: &WishlistItem, b: &WishlistItem) -> Ordering {
        match self.sort {
            WishlistSort::Recent => b.created_at.cmp(&a.created_at),
            WishlistSort::Oldest => a.created_at.cmp(&b.created_at),
            WishlistSort::PriceLowHigh => price_order(a.price(), b.price()),
            WishlistSort::PriceHighLow => price_order(b.price(), a.price()),
            WishlistSort::Title => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
        }
    }
}

/// Unpriced items sort last in both directions.
fn price_order(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The user's wishlist.
///
/// Removals are held locally for the undo window and only sent to the
/// server when the window closes, the removal is committed, or the
/// resource is closed.
pub struct WishlistResource {
    ctx: SyncContext,
    core: Arc<ResourceCore<WishlistItem, ()>>,
    filters: Mutex<WishlistFilters>,
}

impl WishlistResource {
    #[must_use]
    pub fn new(ctx: &SyncContext) -> Self {
        let core = ResourceCore::new(ResourceKind::Wishlist, &ctx.config, ctx.events().clone());
        Self {
            ctx: ctx.clone(),
            core: Arc::new(core),
            filters: Mutex::new(WishlistFilters::default()),
        }
    }

    #[must_use]
    pub fn filters(&self) -> WishlistFilters {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_filters(&self, filters: WishlistFilters) {
        *self.filters.lock().unwrap_or_else(PoisonError::into_inner) = filters;
    }

    /// Loaded items after the local filter and sort.
    #[must_use]
    pub fn visible_items(&self) -> Vec<WishlistItem> {
        let filters = self.filters();
        let mut items: Vec<WishlistItem> =
            self.core.items().into_iter().filter(|item| filters.matches(item)).collect();
        items.sort_by(|a, b| filters.compare(a, b));
        items
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
                resilience.execute("fetch wishlist", || api.list_wishlist(page)).await
            })
            .await
    }

    fn find_by_product(&self, product_id: &str) -> Option<WishlistItem> {
        self.core
            .with_state(|s| s.list.items().iter().find(|i| i.product_id == product_id).cloned())
    }

    #[must_use]
    pub fn is_saved(&self, product_id: &str) -> bool {
        self.find_by_product(product_id).is_some()
    }

    /// Add a product. A placeholder is shown first and replaced by the
    /// server record; `product` fills in display data meanwhile.
    ///
    /// Re-adding a product whose removal is still held cancels the removal.
    pub async fn add(
        &self,
        new_item: NewWishlistItem,
        product: Option<Product>,
    ) -> OperationOutcome<WishlistItem> {
        if let Some(removal) = self.core.discard_undo(&new_item.product_id) {
            let item = removal.item.clone();
            self.core.with_state(|s| s.list.restore(removal));
            tracing::debug!(product_id = %new_item.product_id, "held removal cancelled by add");
            return OperationOutcome::Success(item);
        }
        if self.is_saved(&new_item.product_id) {
            return OperationOutcome::Failed(FitFindError::Conflict(
                "Item already in wishlist".to_owned(),
            ));
        }

        let placeholder_id = pending_id(&Uuid::new_v4().to_string());
        let placeholder = WishlistItem::placeholder(placeholder_id.clone(), &new_item, product);
        let rollback =
            self.core.with_state(|s| s.list.add(placeholder.clone(), InsertPosition::Prepend));

        let api = &self.ctx.api;
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "add to wishlist",
                QueuedMutation::AddToWishlist { item: new_item.clone() },
                || api.add_to_wishlist(&new_item),
            )
            .await;
        if self.core.is_closed() {
            return outcome;
        }

        match outcome {
            OperationOutcome::Success(mut item) => {
                if item.product.is_none() {
                    item.product = placeholder.product;
                }
                self.core.with_state(|s| {
                    s.list.confirm_add(&placeholder_id, item.clone(), InsertPosition::Prepend);
                });
                self.core.clear_error();
                self.core.publish(SyncEvent::ItemAdded(self.core.item_event(&item.id, None)));
                OperationOutcome::Success(item)
            },
            OperationOutcome::Queued(id) => {
                self.core.clear_error();
                OperationOutcome::Queued(id)
            },
            OperationOutcome::Failed(err) => {
                self.core.with_state(|s| s.list.rollback(rollback));
                self.core.record_failure("add", &err);
                OperationOutcome::Failed(err)
            },
        }
    }

    /// Remove a product from the list.
    ///
    /// With undo enabled the server call waits until the window closes;
    /// see [`Self::commit`].
    pub async fn remove(&self, product_id: &str) -> OperationOutcome<()> {
        let Some(item) = self.find_by_product(product_id) else {
            return OperationOutcome::Failed(FitFindError::NotFound(
                "Item not found in wishlist".to_owned(),
            ));
        };
        let Some(removal) = self.core.with_state(|s| s.list.remove(item.identity())) else {
            return OperationOutcome::Failed(FitFindError::NotFound(
                "Item not found in wishlist".to_owned(),
            ));
        };

        if self.core.undo_enabled() {
            self.core.push_undo(product_id, removal);
            let ctx = self.ctx.clone();
            let core = Arc::clone(&self.core);
            let id = product_id.to_owned();
            self.core.schedule_commit(product_id, move |removal| async move {
                send_removal(&ctx, &core, &id, removal).await;
            });
            tracing::debug!(product_id, "wishlist removal held for undo");
            return OperationOutcome::Success(());
        }
        send_removal(&self.ctx, &self.core, product_id, removal).await
    }

    /// Put a removed product back at its original position.
    ///
    /// Returns `false` once the undo window has closed.
    pub fn undo_remove(&self, product_id: &str) -> bool {
        let Some(removal) = self.core.take_undo(product_id) else {
            return false;
        };
        self.core.with_state(|s| s.list.restore(removal));
        true
    }

    #[must_use]
    pub fn can_undo(&self, product_id: &str) -> bool {
        self.core.can_undo(product_id)
    }

    /// Send a held removal to the server now.
    pub async fn commit(&self, product_id: &str) -> Option<OperationOutcome<()>> {
        let removal = self.core.discard_undo(product_id)?;
        Some(send_removal(&self.ctx, &self.core, product_id, removal).await)
    }

    /// Send every removal whose undo window has closed. Returns how many were sent.
    pub async fn commit_expired(&self) -> usize {
        let expired = self.core.take_expired_undo();
        let count = expired.len();
        for (product_id, removal) in expired {
            send_removal(&self.ctx, &self.core, &product_id, removal).await;
        }
        count
    }

    /// Send every held removal regardless of its window.
    pub async fn flush(&self) -> usize {
        let pending = self.core.drain_undo();
        let count = pending.len();
        for (product_id, removal) in pending {
            send_removal(&self.ctx, &self.core, &product_id, removal).await;
        }
        count
    }

    /// Edit notes or tags, rolling back to the previous record on failure.
    pub async fn update(
        &self,
        item_id: &str,
        updates: WishlistUpdate,
    ) -> OperationOutcome<WishlistItem> {
        if updates.is_empty() {
            return OperationOutcome::Failed(FitFindError::Validation(
                "No updates provided".to_owned(),
            ));
        }
        let rollback = self.core.with_state(|s| {
            let updated = s.list.get(item_id)?.with_updates(&updates);
            s.list.replace(item_id, updated)
        });
        let Some(rollback) = rollback else {
            return OperationOutcome::Failed(FitFindError::NotFound(
                "Wishlist item not found".to_owned(),
            ));
        };

        let api = &self.ctx.api;
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "update wishlist item",
                QueuedMutation::UpdateWishlistItem {
                    id: item_id.to_owned(),
                    updates: updates.clone(),
                },
                || api.update_wishlist_item(item_id, &updates),
            )
            .await;
        if self.core.is_closed() {
            return outcome;
        }

        match &outcome {
            OperationOutcome::Success(item) => {
                self.core.with_state(|s| {
                    let mut confirmed = item.clone();
                    if confirmed.product.is_none() {
                        confirmed.product = s.list.get(item_id).and_then(|i| i.product.clone());
                    }
                    s.list.replace(item_id, confirmed);
                });
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

    /// Ask the server which of `product_ids` are saved.
    ///
    /// # Errors
    /// Returns the API error after retries.
    pub async fn check_status(
        &self,
        product_ids: &[String],
    ) -> Result<HashMap<String, bool>, FitFindError> {
        let api = &self.ctx.api;
        self.ctx
            .resilience
            .execute("check wishlist status", || api.check_wishlist(product_ids))
            .await
    }

    /// Remove several products at once, without undo.
    pub async fn bulk_remove(&self, product_ids: &[String]) -> BulkOutcome {
        let identities: HashMap<String, String> = self.core.with_state(|s| {
            s.list
                .items()
                .iter()
                .filter(|item| product_ids.contains(&item.product_id))
                .map(|item| (item.product_id.clone(), item.id.clone()))
                .collect()
        });
        let item_ids: Vec<String> = identities.values().cloned().collect();
        let removals = self.core.remove_many(&item_ids);

        let api = &self.ctx.api;
        let resilience = &self.ctx.resilience;
        let config = &self.ctx.config;
        let outcome =
            bulk_delete(product_ids, config.bulk_batch_size, config.bulk_batch_delay, |id| {
                async move {
                    resilience
                        .execute("bulk remove from wishlist", || api.remove_from_wishlist(&id))
                        .await
                }
            })
            .await;
        if self.core.is_closed() {
            return outcome;
        }

        let to_items = |ids: &[String]| -> Vec<String> {
            ids.iter().filter_map(|id| identities.get(id).cloned()).collect()
        };
        let deleted = to_items(&outcome.deleted_ids);
        self.core.restore_failed(&removals, &to_items(&outcome.failed_ids), &deleted);
        self.core.record_bulk_result("items", outcome.failed_ids.len(), product_ids.len());
        for id in &deleted {
            self.core.publish(SyncEvent::ItemDeleted(self.core.item_event(id, None)));
        }
        outcome
    }

    #[must_use]
    pub fn items(&self) -> Vec<WishlistItem> {
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
        tracing::debug!(count = held.len(), "sending held wishlist removals on close");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let ctx = self.ctx.clone();
            let core = Arc::clone(&self.core);
            handle.spawn(async move {
                for (product_id, removal) in held {
                    send_removal(&ctx, &core, &product_id, removal).await;
                }
            });
        } else {
            for (product_id, _) in held {
                self.ctx.resilience.enqueue("remove from wishlist", removal_mutation(&product_id));
            }
        }
    }
}

fn removal_mutation(product_id: &str) -> QueuedMutation {
    QueuedMutation::RemoveFromWishlist { product_id: product_id.to_owned() }
}

/// Delete a product on the server, restoring it locally on failure.
///
/// The deletion is published even after the resource closed, so other views
/// still drop the item.
async fn send_removal(
    ctx: &SyncContext,
    core: &ResourceCore<WishlistItem, ()>,
    product_id: &str,
    removal: Removal<WishlistItem>,
) -> OperationOutcome<()> {
    let api = &ctx.api;
    let outcome = ctx
        .resilience
        .execute_or_queue("remove from wishlist", removal_mutation(product_id), || {
            api.remove_from_wishlist(product_id)
        })
        .await;
    if outcome.is_success() {
        core.publish(SyncEvent::ItemDeleted(core.item_event(removal.item.identity(), None)));
    }
    if core.is_closed() {
        if let OperationOutcome::Failed(err) = &outcome {
            tracing::warn!(product_id, error = %err, "wishlist removal failed after close");
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

impl EventSink for WishlistResource {
    fn apply_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::ItemDeleted(item)
                if item.resource == ResourceKind::Wishlist && !self.core.is_own(item) =>
            {
                self.core.with_state(|s| s.list.remove(&item.id));
            },
            SyncEvent::ItemAdded(item) | SyncEvent::ItemRestored(item)
                if item.resource == ResourceKind::Wishlist && !self.core.is_own(item) =>
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
