use serde::{Deserialize, Serialize};

use crate::Identified;

/// A product recommended for a clothing item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub old_price: Option<f64>,
    #[serde(default)]
    pub discount_percentage: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i64>,
    #[serde(default)]
    pub delivery_info: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Identified for Product {
    fn identity(&self) -> &str {
        &self.id
    }
}
