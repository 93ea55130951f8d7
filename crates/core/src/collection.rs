use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COLLECTION_NAME, MAX_COLLECTION_NAME_LEN};
use crate::{FitFindError, Identified, WishlistItem};

/// A user-defined, named group of saved items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default, alias = "total_items")]
    pub item_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Collection {
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_COLLECTION_NAME
    }

    #[must_use]
    pub fn placeholder(id: String, new_collection: &NewCollection) -> Self {
        Self {
            id,
            name: new_collection.name.clone(),
            description: new_collection.description.clone(),
            cover_image_url: None,
            is_private: new_collection.is_private,
            item_count: 0,
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }

    #[must_use]
    pub fn with_updates(&self, updates: &CollectionUpdate) -> Self {
        let mut next = self.clone();
        if let Some(name) = &updates.name {
            next.name = name.trim().to_owned();
        }
        if let Some(description) = &updates.description {
            next.description = Some(description.clone());
        }
        if let Some(cover) = &updates.cover_image_url {
            next.cover_image_url = Some(cover.clone());
        }
        if let Some(is_private) = updates.is_private {
            next.is_private = is_private;
        }
        next.updated_at = Some(Utc::now());
        next
    }
}

impl Identified for Collection {
    fn identity(&self) -> &str {
        &self.id
    }
}

/// Body of `POST /api/collections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

impl NewCollection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, is_private: false }
    }

    /// Reject names the server would refuse; returns the trimmed request.
    ///
    /// # Errors
    /// Returns `Validation` when the name is blank or too long.
    pub fn validated(&self) -> Result<Self, FitFindError> {
        let name = validate_collection_name(&self.name)?;
        Ok(Self { name, ..self.clone() })
    }
}

/// Editable fields of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

impl CollectionUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.cover_image_url.is_none()
            && self.is_private.is_none()
    }
}

fn validate_collection_name(name: &str) -> Result<String, FitFindError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FitFindError::Validation("Collection name is required".to_owned()));
    }
    if trimmed.chars().count() > MAX_COLLECTION_NAME_LEN {
        return Err(FitFindError::Validation(format!(
            "Collection name must be at most {MAX_COLLECTION_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

/// Membership of a saved item in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    #[serde(default)]
    pub id: String,
    pub collection_id: String,
    pub saved_item_id: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "user_saved_items")]
    pub saved_item: Option<WishlistItem>,
}

impl CollectionItem {
    #[must_use]
    pub fn placeholder(
        id: String,
        collection_id: &str,
        saved_item_id: &str,
        position: i64,
        saved_item: Option<WishlistItem>,
    ) -> Self {
        Self {
            id,
            collection_id: collection_id.to_owned(),
            saved_item_id: saved_item_id.to_owned(),
            position,
            added_at: Some(Utc::now()),
            saved_item,
        }
    }
}

/// A collection item is identified by the saved item it points to.
impl Identified for CollectionItem {
    fn identity(&self) -> &str {
        &self.saved_item_id
    }
}

/// One entry of `PUT /api/collections/{id}/reorder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPosition {
    pub saved_item_id: String,
    pub position: i64,
}
