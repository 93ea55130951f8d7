//! Test utilities and module declarations for sync tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use fitfind_core::{
    Collection, CollectionItem, CollectionUpdate, FitFindApi, FitFindError, HistoryEntry,
    ItemPosition, NewCollection, NewWishlistItem, Page, PageRequest, Pagination, Product,
    RedoRequest, Result, SearchResult, SearchSession, WishlistItem, WishlistUpdate,
};

use crate::{NetworkMonitor, OfflineQueue, SyncConfig, SyncContext};

mod replay_tests;
mod save_item_tests;

#[derive(Default)]
struct MockState {
    history: Vec<HistoryEntry>,
    deleted_history: Vec<HistoryEntry>,
    wishlist: Vec<WishlistItem>,
    collections: Vec<Collection>,
    collection_items: HashMap<String, Vec<CollectionItem>>,
    failures: HashMap<&'static str, VecDeque<FitFindError>>,
    calls: HashMap<&'static str, usize>,
    reorders: Vec<Vec<ItemPosition>>,
    next_id: u64,
    delay: Option<Duration>,
}

/// In-memory `FitFindApi` with scripted failures and call counting.
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Make the next call to `method` fail with `err`. Calls queue up.
    pub fn fail(&self, method: &'static str, err: FitFindError) {
        self.with(|s| s.failures.entry(method).or_default().push_back(err));
    }

    pub fn fail_times(&self, method: &'static str, err: &FitFindError, times: usize) {
        for _ in 0..times {
            self.fail(method, err.clone());
        }
    }

    pub fn calls(&self, method: &'static str) -> usize {
        self.with(|s| s.calls.get(method).copied().unwrap_or(0))
    }

    /// Every call sleeps for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.with(|s| s.delay = Some(delay));
    }

    pub fn seed_history(&self, ids: &[&str]) {
        self.with(|s| s.history = ids.iter().map(|id| history_entry(id)).collect());
    }

    pub fn seed_wishlist(&self, items: Vec<WishlistItem>) {
        self.with(|s| s.wishlist = items);
    }

    pub fn seed_collections(&self, collections: Vec<Collection>) {
        self.with(|s| s.collections = collections);
    }

    pub fn seed_collection_items(&self, collection_id: &str, saved_item_ids: &[&str]) {
        let items = saved_item_ids
            .iter()
            .zip(1..)
            .map(|(id, position)| collection_item(collection_id, id, position))
            .collect();
        self.with(|s| s.collection_items.insert(collection_id.to_owned(), items));
    }

    pub fn history_ids(&self) -> Vec<String> {
        self.with(|s| s.history.iter().map(|h| h.id.clone()).collect())
    }

    pub fn wishlist_products(&self) -> Vec<String> {
        self.with(|s| s.wishlist.iter().map(|w| w.product_id.clone()).collect())
    }

    pub fn collection_item_ids(&self, collection_id: &str) -> Vec<String> {
        self.with(|s| {
            s.collection_items
                .get(collection_id)
                .map(|items| items.iter().map(|i| i.saved_item_id.clone()).collect())
                .unwrap_or_default()
        })
    }

    pub fn last_reorder(&self) -> Option<Vec<ItemPosition>> {
        self.with(|s| s.reorders.last().cloned())
    }

    /// Count the call, then sleep and fail as scripted.
    async fn enter(&self, method: &'static str) -> Result<()> {
        let (delay, failure) = self.with(|s| {
            *s.calls.entry(method).or_default() += 1;
            let failure = s.failures.get_mut(method).and_then(VecDeque::pop_front);
            (s.delay, failure)
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        failure.map_or(Ok(()), Err)
    }

    fn next_id(&self, prefix: &str) -> String {
        self.with(|s| {
            s.next_id += 1;
            format!("{prefix}-{}", s.next_id)
        })
    }
}

fn page_of<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    let start = (page.offset as usize).min(items.len());
    let end = (start + page.limit as usize).min(items.len());
    Page::new(
        items[start..end].to_vec(),
        Pagination {
            limit: page.limit,
            offset: page.offset,
            has_more: end < items.len(),
            total_count: items.len() as u64,
        },
    )
}

#[async_trait]
impl FitFindApi for MockApi {
    async fn upload_image(&self, file_name: &str, _bytes: Vec<u8>) -> Result<SearchResult> {
        self.enter("upload_image").await?;
        Ok(SearchResult {
            file_id: format!("file-{file_name}"),
            session_id: Some("s1".to_owned()),
            image_url: None,
            num_items_identified: 0,
            num_products_found: 0,
            search_queries: Vec::new(),
            conversation_context: serde_json::Value::Null,
            results: serde_json::Value::Null,
        })
    }

    async fn redo_search(&self, request: &RedoRequest) -> Result<SearchResult> {
        self.enter("redo_search").await?;
        self.upload_image(&request.file_id, Vec::new()).await
    }

    async fn list_history(
        &self,
        page: PageRequest,
        _include_details: bool,
    ) -> Result<Page<HistoryEntry>> {
        self.enter("list_history").await?;
        Ok(self.with(|s| page_of(&s.history, page)))
    }

    async fn get_search_session(&self, session_id: &str) -> Result<SearchSession> {
        self.enter("get_search_session").await?;
        Ok(search_session(session_id))
    }

    async fn delete_history_entry(&self, id: &str) -> Result<()> {
        self.enter("delete_history_entry").await?;
        self.with(|s| {
            let index = s
                .history
                .iter()
                .position(|h| h.id == id)
                .ok_or_else(|| FitFindError::NotFound("Search session not found".to_owned()))?;
            let entry = s.history.remove(index);
            s.deleted_history.push(entry);
            Ok(())
        })
    }

    async fn restore_history_entry(&self, id: &str) -> Result<()> {
        self.enter("restore_history_entry").await?;
        self.with(|s| {
            let index = s
                .deleted_history
                .iter()
                .position(|h| h.id == id)
                .ok_or_else(|| FitFindError::NotFound("Search session not found".to_owned()))?;
            let entry = s.deleted_history.remove(index);
            s.history.push(entry);
            Ok(())
        })
    }

    async fn list_wishlist(&self, page: PageRequest) -> Result<Page<WishlistItem>> {
        self.enter("list_wishlist").await?;
        Ok(self.with(|s| page_of(&s.wishlist, page)))
    }

    async fn add_to_wishlist(&self, item: &NewWishlistItem) -> Result<WishlistItem> {
        self.enter("add_to_wishlist").await?;
        let id = self.next_id("w");
        self.with(|s| {
            if s.wishlist.iter().any(|w| w.product_id == item.product_id) {
                return Err(FitFindError::Conflict("Item already in wishlist".to_owned()));
            }
            let saved = WishlistItem::placeholder(id, item, None);
            s.wishlist.insert(0, saved.clone());
            Ok(saved)
        })
    }

    async fn remove_from_wishlist(&self, product_id: &str) -> Result<()> {
        self.enter("remove_from_wishlist").await?;
        self.with(|s| {
            let before = s.wishlist.len();
            s.wishlist.retain(|w| w.product_id != product_id);
            if s.wishlist.len() == before {
                return Err(FitFindError::NotFound("Item not found in wishlist".to_owned()));
            }
            Ok(())
        })
    }

    async fn update_wishlist_item(
        &self,
        wishlist_item_id: &str,
        updates: &WishlistUpdate,
    ) -> Result<WishlistItem> {
        self.enter("update_wishlist_item").await?;
        self.with(|s| {
            let item = s
                .wishlist
                .iter_mut()
                .find(|w| w.id == wishlist_item_id)
                .ok_or_else(|| FitFindError::NotFound("Wishlist item not found".to_owned()))?;
            *item = item.with_updates(updates);
            Ok(item.clone())
        })
    }

    async fn check_wishlist(&self, product_ids: &[String]) -> Result<HashMap<String, bool>> {
        self.enter("check_wishlist").await?;
        Ok(self.with(|s| {
            product_ids
                .iter()
                .map(|id| (id.clone(), s.wishlist.iter().any(|w| &w.product_id == id)))
                .collect()
        }))
    }

    async fn list_collections(&self, page: PageRequest) -> Result<Page<Collection>> {
        self.enter("list_collections").await?;
        Ok(self.with(|s| page_of(&s.collections, page)))
    }

    async fn create_collection(&self, collection: &NewCollection) -> Result<Collection> {
        self.enter("create_collection").await?;
        let id = self.next_id("c");
        let created = Collection::placeholder(id, collection);
        self.with(|s| s.collections.insert(0, created.clone()));
        Ok(created)
    }

    async fn update_collection(&self, id: &str, updates: &CollectionUpdate) -> Result<Collection> {
        self.enter("update_collection").await?;
        self.with(|s| {
            let collection = s
                .collections
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| FitFindError::NotFound("Collection not found".to_owned()))?;
            *collection = collection.with_updates(updates);
            Ok(collection.clone())
        })
    }

    async fn delete_collection(&self, id: &str) -> Result<()> {
        self.enter("delete_collection").await?;
        self.with(|s| {
            s.collections.retain(|c| c.id != id);
            s.collection_items.remove(id);
        });
        Ok(())
    }

    async fn list_collection_items(
        &self,
        collection_id: &str,
        page: PageRequest,
    ) -> Result<Page<CollectionItem>> {
        self.enter("list_collection_items").await?;
        Ok(self.with(|s| {
            let items = s.collection_items.get(collection_id).cloned().unwrap_or_default();
            page_of(&items, page)
        }))
    }

    async fn add_collection_item(&self, collection_id: &str, saved_item_id: &str) -> Result<()> {
        self.enter("add_collection_item").await?;
        self.with(|s| {
            let items = s.collection_items.entry(collection_id.to_owned()).or_default();
            if items.iter().any(|i| i.saved_item_id == saved_item_id) {
                return Err(FitFindError::Conflict("Item already in collection".to_owned()));
            }
            let position = items.iter().map(|i| i.position).max().unwrap_or(0) + 1;
            items.push(collection_item(collection_id, saved_item_id, position));
            Ok(())
        })
    }

    async fn remove_collection_item(
        &self,
        collection_id: &str,
        saved_item_id: &str,
    ) -> Result<()> {
        self.enter("remove_collection_item").await?;
        self.with(|s| {
            if let Some(items) = s.collection_items.get_mut(collection_id) {
                items.retain(|i| i.saved_item_id != saved_item_id);
            }
        });
        Ok(())
    }

    async fn reorder_collection_items(
        &self,
        collection_id: &str,
        positions: &[ItemPosition],
    ) -> Result<()> {
        self.enter("reorder_collection_items").await?;
        self.with(|s| {
            if let Some(items) = s.collection_items.get_mut(collection_id) {
                for item in items.iter_mut() {
                    if let Some(p) = positions.iter().find(|p| p.saved_item_id == item.saved_item_id)
                    {
                        item.position = p.position;
                    }
                }
                items.sort_by_key(|i| i.position);
            }
            s.reorders.push(positions.to_vec());
        });
        Ok(())
    }
}

pub fn history_entry(id: &str) -> HistoryEntry {
    HistoryEntry {
        id: id.to_owned(),
        session_id: format!("session-{id}"),
        created_at: None,
        session: None,
    }
}

pub fn search_session(id: &str) -> SearchSession {
    SearchSession {
        id: id.to_owned(),
        file_id: None,
        image_filename: None,
        image_url: None,
        status: Some("completed".to_owned()),
        num_items_identified: 2,
        num_products_found: 10,
        search_queries: Vec::new(),
        created_at: None,
        clothing_items: Vec::new(),
    }
}

pub fn product(id: &str, title: &str, price: Option<f64>) -> Product {
    Product {
        id: id.to_owned(),
        external_id: None,
        title: title.to_owned(),
        price,
        old_price: None,
        discount_percentage: None,
        image_url: None,
        product_url: None,
        source: None,
        rating: None,
        review_count: None,
        delivery_info: None,
        tags: Vec::new(),
    }
}

/// Saved item `w-<product_id>` for `product_id`, created `day` days into 2024.
pub fn wishlist_item(product_id: &str, title: &str, price: Option<f64>, day: u32) -> WishlistItem {
    WishlistItem {
        id: format!("w-{product_id}"),
        product_id: product_id.to_owned(),
        notes: None,
        tags: Vec::new(),
        created_at: Some(Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()),
        product: Some(product(product_id, title, price)),
    }
}

pub fn collection(id: &str, name: &str) -> Collection {
    Collection {
        id: id.to_owned(),
        name: name.to_owned(),
        description: None,
        cover_image_url: None,
        is_private: false,
        item_count: 0,
        created_at: None,
        updated_at: None,
    }
}

pub fn collection_item(collection_id: &str, saved_item_id: &str, position: i64) -> CollectionItem {
    CollectionItem {
        id: format!("ci-{saved_item_id}"),
        collection_id: collection_id.to_owned(),
        saved_item_id: saved_item_id.to_owned(),
        position,
        added_at: None,
        saved_item: None,
    }
}

/// Settings with millisecond backoff so failing calls finish quickly.
pub fn test_config() -> SyncConfig {
    SyncConfig {
        retry_base_delay: Duration::from_millis(1),
        retry_max_delay: Duration::from_millis(4),
        bulk_batch_delay: Duration::from_millis(1),
        ..SyncConfig::default()
    }
}

pub fn context_with(api: &Arc<MockApi>, config: SyncConfig) -> SyncContext {
    let api: Arc<dyn FitFindApi> = api.clone();
    SyncContext::with_parts(api, config, Arc::new(OfflineQueue::in_memory()), NetworkMonitor::default())
}

pub fn context(api: &Arc<MockApi>) -> SyncContext {
    context_with(api, test_config())
}

pub fn no_undo_config() -> SyncConfig {
    SyncConfig { undo_window: None, ..test_config() }
}

pub fn server_error() -> FitFindError {
    FitFindError::from_status(500, "Internal server error")
}

pub fn ids<T: fitfind_core::Identified>(items: &[T]) -> Vec<String> {
    items.iter().map(|item| item.identity().to_owned()).collect()
}
