use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Identified, Product};

/// A product saved to the user's wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    /// Saved item id. Collections reference this as `saved_item_id`.
    pub id: String,
    pub product_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "products")]
    pub product: Option<Product>,
}

impl WishlistItem {
    /// Local stand-in shown while an add is in flight.
    #[must_use]
    pub fn placeholder(id: String, new_item: &NewWishlistItem, product: Option<Product>) -> Self {
        Self {
            id,
            product_id: new_item.product_id.clone(),
            notes: new_item.notes.clone(),
            tags: new_item.tags.clone(),
            created_at: Some(Utc::now()),
            product,
        }
    }

    /// Copy of this item with `updates` applied.
    #[must_use]
    pub fn with_updates(&self, updates: &WishlistUpdate) -> Self {
        let mut next = self.clone();
        if let Some(notes) = &updates.notes {
            next.notes = Some(notes.clone());
        }
        if let Some(tags) = &updates.tags {
            next.tags = tags.clone();
        }
        next
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.product.as_ref().map_or("", |p| p.title.as_str())
    }

    #[must_use]
    pub fn price(&self) -> Option<f64> {
        self.product.as_ref().and_then(|p| p.price)
    }
}

impl Identified for WishlistItem {
    fn identity(&self) -> &str {
        &self.id
    }
}

/// Body of `POST /api/wishlist/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWishlistItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewWishlistItem {
    #[must_use]
    pub fn new(product_id: impl Into<String>) -> Self {
        Self { product_id: product_id.into(), notes: None, tags: Vec::new() }
    }
}

/// Editable fields of a wishlist item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl WishlistUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.notes.is_none() && self.tags.is_none()
    }
}
