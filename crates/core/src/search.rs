use serde::{Deserialize, Serialize};

/// Response of `POST /api/upload` and `POST /api/redo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub num_items_identified: u32,
    #[serde(default)]
    pub num_products_found: u32,
    #[serde(default)]
    pub search_queries: Vec<String>,
    /// Opaque context the server needs to refine the search.
    #[serde(default)]
    pub conversation_context: serde_json::Value,
    /// Recommendations grouped by clothing item; the shape is owned by the server.
    #[serde(default, alias = "cleaned_data")]
    pub results: serde_json::Value,
}

/// Body of `POST /api/redo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedoRequest {
    pub file_id: String,
    pub conversation_context: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}
