use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Identified, Product};

/// One row of the user's search history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "search_sessions")]
    pub session: Option<SearchSession>,
}

impl Identified for HistoryEntry {
    fn identity(&self) -> &str {
        &self.id
    }
}

/// A photo upload and the recommendations generated for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSession {
    pub id: String,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub image_filename: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub num_items_identified: u32,
    #[serde(default)]
    pub num_products_found: u32,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clothing_items: Vec<ClothingItem>,
}

/// A garment detected in the photo with its matched products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothingItem {
    pub id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub total_products: u32,
    #[serde(default)]
    pub products: Vec<Product>,
}
