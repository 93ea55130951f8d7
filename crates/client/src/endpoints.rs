//! `FitFindApi` over HTTP.

use std::collections::HashMap;

use async_trait::async_trait;
use fitfind_core::{
    Collection, CollectionItem, CollectionUpdate, FitFindApi, HistoryEntry, ItemPosition,
    NewCollection, NewWishlistItem, Page, PageRequest, RedoRequest, Result, SearchResult,
    SearchSession, WishlistItem, WishlistUpdate,
};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::json;

use crate::client::ApiClient;

fn page_query(page: PageRequest) -> [(&'static str, String); 2] {
    [("limit", page.limit.to_string()), ("offset", page.offset.to_string())]
}

#[async_trait]
impl FitFindApi for ApiClient {
    async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<SearchResult> {
        let part = Part::bytes(bytes).file_name(file_name.to_owned());
        let form = Form::new().part("file", part);
        let builder = self.request(Method::POST, "/api/upload").multipart(form);
        let envelope = self.execute(builder, "upload").await?;
        Ok(envelope.into_flat("upload response")?)
    }

    async fn redo_search(&self, request: &RedoRequest) -> Result<SearchResult> {
        let builder = self.request(Method::POST, "/api/redo").json(request);
        let envelope = self.execute(builder, "redo search").await?;
        Ok(envelope.into_flat("redo response")?)
    }

    async fn list_history(
        &self,
        page: PageRequest,
        include_details: bool,
    ) -> Result<Page<HistoryEntry>> {
        let builder = self
            .request(Method::GET, "/api/history")
            .query(&page_query(page))
            .query(&[("include_details", include_details.to_string())]);
        let mut envelope = self.execute(builder, "list history").await?;
        Ok(envelope.take_page("history")?)
    }

    async fn get_search_session(&self, session_id: &str) -> Result<SearchSession> {
        let builder = self.request(Method::GET, &format!("/api/history/{session_id}"));
        let mut envelope = self.execute(builder, "search session").await?;
        Ok(envelope.take("session")?)
    }

    async fn delete_history_entry(&self, id: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("/api/history/{id}"));
        self.execute(builder, "delete history entry").await?;
        Ok(())
    }

    async fn restore_history_entry(&self, id: &str) -> Result<()> {
        let builder = self.request(Method::POST, &format!("/api/history/{id}/restore"));
        self.execute(builder, "restore history entry").await?;
        Ok(())
    }

    async fn list_wishlist(&self, page: PageRequest) -> Result<Page<WishlistItem>> {
        let builder = self.request(Method::GET, "/api/wishlist").query(&page_query(page));
        let mut envelope = self.execute(builder, "list wishlist").await?;
        Ok(envelope.take_page("wishlist")?)
    }

    async fn add_to_wishlist(&self, item: &NewWishlistItem) -> Result<WishlistItem> {
        let builder = self.request(Method::POST, "/api/wishlist/add").json(item);
        let mut envelope = self.execute(builder, "add to wishlist").await?;
        Ok(envelope.take("item")?)
    }

    async fn remove_from_wishlist(&self, product_id: &str) -> Result<()> {
        let builder = self
            .request(Method::POST, "/api/wishlist/remove")
            .json(&json!({ "product_id": product_id }));
        self.execute(builder, "remove from wishlist").await?;
        Ok(())
    }

    async fn update_wishlist_item(
        &self,
        wishlist_item_id: &str,
        updates: &WishlistUpdate,
    ) -> Result<WishlistItem> {
        let builder = self
            .request(Method::PUT, "/api/wishlist/update")
            .json(&json!({ "wishlist_item_id": wishlist_item_id, "updates": updates }));
        let mut envelope = self.execute(builder, "update wishlist item").await?;
        Ok(envelope.take("item")?)
    }

    async fn check_wishlist(&self, product_ids: &[String]) -> Result<HashMap<String, bool>> {
        let builder = self
            .request(Method::POST, "/api/wishlist/check")
            .json(&json!({ "product_ids": product_ids }));
        let mut envelope = self.execute(builder, "check wishlist").await?;
        Ok(envelope.take("wishlist_status")?)
    }

    async fn list_collections(&self, page: PageRequest) -> Result<Page<Collection>> {
        let builder = self.request(Method::GET, "/api/collections").query(&page_query(page));
        let mut envelope = self.execute(builder, "list collections").await?;
        Ok(envelope.take_page("collections")?)
    }

    async fn create_collection(&self, collection: &NewCollection) -> Result<Collection> {
        let builder = self.request(Method::POST, "/api/collections").json(collection);
        let mut envelope = self.execute(builder, "create collection").await?;
        Ok(envelope.take("collection")?)
    }

    async fn update_collection(&self, id: &str, updates: &CollectionUpdate) -> Result<Collection> {
        let builder = self.request(Method::PUT, &format!("/api/collections/{id}")).json(updates);
        let mut envelope = self.execute(builder, "update collection").await?;
        Ok(envelope.take("collection")?)
    }

    async fn delete_collection(&self, id: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("/api/collections/{id}"));
        self.execute(builder, "delete collection").await?;
        Ok(())
    }

    async fn list_collection_items(
        &self,
        collection_id: &str,
        page: PageRequest,
    ) -> Result<Page<CollectionItem>> {
        let builder = self
            .request(Method::GET, &format!("/api/collections/{collection_id}"))
            .query(&page_query(page));
        let mut envelope = self.execute(builder, "list collection items").await?;
        Ok(envelope.take_page("items")?)
    }

    async fn add_collection_item(&self, collection_id: &str, saved_item_id: &str) -> Result<()> {
        let builder = self
            .request(Method::POST, &format!("/api/collections/{collection_id}/items"))
            .json(&json!({ "saved_item_id": saved_item_id }));
        self.execute(builder, "add collection item").await?;
        Ok(())
    }

    async fn remove_collection_item(
        &self,
        collection_id: &str,
        saved_item_id: &str,
    ) -> Result<()> {
        let path = format!("/api/collections/{collection_id}/items/{saved_item_id}");
        let builder = self.request(Method::DELETE, &path);
        self.execute(builder, "remove collection item").await?;
        Ok(())
    }

    async fn reorder_collection_items(
        &self,
        collection_id: &str,
        positions: &[ItemPosition],
    ) -> Result<()> {
        let builder = self
            .request(Method::PUT, &format!("/api/collections/{collection_id}/reorder"))
            .json(&json!({ "item_positions": positions }));
        self.execute(builder, "reorder collection items").await?;
        Ok(())
    }
}
