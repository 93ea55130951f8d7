//! Remote API abstraction trait
//!
//! The sync engine only talks to the backend through this trait.
//! `fitfind-client` implements it over HTTP; tests implement it in memory.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    Collection, CollectionItem, CollectionUpdate, HistoryEntry, ItemPosition, NewCollection,
    NewWishlistItem, Page, PageRequest, RedoRequest, Result, SearchResult, SearchSession,
    WishlistItem, WishlistUpdate,
};

/// The FitFind REST contract.
///
/// Every method performs exactly one request. Retrying, queuing and
/// optimistic state are the caller's business.
#[async_trait]
pub trait FitFindApi: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────────────

    /// Upload an outfit photo and get recommendations.
    async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<SearchResult>;

    /// Re-run a search with refined context.
    async fn redo_search(&self, request: &RedoRequest) -> Result<SearchResult>;

    // ─────────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────────

    async fn list_history(
        &self,
        page: PageRequest,
        include_details: bool,
    ) -> Result<Page<HistoryEntry>>;

    async fn get_search_session(&self, session_id: &str) -> Result<SearchSession>;

    /// Soft-delete a history entry.
    async fn delete_history_entry(&self, id: &str) -> Result<()>;

    /// Undo a soft-delete.
    async fn restore_history_entry(&self, id: &str) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Wishlist
    // ─────────────────────────────────────────────────────────────────────────────

    async fn list_wishlist(&self, page: PageRequest) -> Result<Page<WishlistItem>>;

    async fn add_to_wishlist(&self, item: &NewWishlistItem) -> Result<WishlistItem>;

    async fn remove_from_wishlist(&self, product_id: &str) -> Result<()>;

    async fn update_wishlist_item(
        &self,
        wishlist_item_id: &str,
        updates: &WishlistUpdate,
    ) -> Result<WishlistItem>;

    /// Map of product id to "is in wishlist".
    async fn check_wishlist(&self, product_ids: &[String]) -> Result<HashMap<String, bool>>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Collections
    // ─────────────────────────────────────────────────────────────────────────────

    async fn list_collections(&self, page: PageRequest) -> Result<Page<Collection>>;

    async fn create_collection(&self, collection: &NewCollection) -> Result<Collection>;

    async fn update_collection(&self, id: &str, updates: &CollectionUpdate) -> Result<Collection>;

    async fn delete_collection(&self, id: &str) -> Result<()>;

    async fn list_collection_items(
        &self,
        collection_id: &str,
        page: PageRequest,
    ) -> Result<Page<CollectionItem>>;

    async fn add_collection_item(&self, collection_id: &str, saved_item_id: &str) -> Result<()>;

    async fn remove_collection_item(&self, collection_id: &str, saved_item_id: &str)
    -> Result<()>;

    async fn reorder_collection_items(
        &self,
        collection_id: &str,
        positions: &[ItemPosition],
    ) -> Result<()>;
}
