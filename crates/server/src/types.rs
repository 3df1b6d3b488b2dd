use chrono::{DateTime, Utc};
use giftguide_vector::{FailureReason, NoSearchReason, ProductId};
use serde::{Deserialize, Serialize};

/// Search query
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query text
    #[serde(default)]
    pub q: String,

    /// Top K results (configured default when absent)
    pub top_k: Option<usize>,
}

/// Successful search
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: &'static str,
    pub query: String,
    pub count: usize,
    pub elapsed_ms: u128,
    pub results: Vec<SearchResultItem>,
}

/// Search hit joined with its catalog row
#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub category: String,
    pub distance: f32,
}

/// Query that was not searched
#[derive(Debug, Serialize)]
pub struct NoSearchResponse {
    pub status: &'static str,
    pub reason: NoSearchReason,
    pub message: String,
}

/// Generic failure shown to end users
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    pub message: String,
}

/// Readiness report
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Preset query offered as a one-click search
#[derive(Debug, Clone, Serialize)]
pub struct QuickCategory {
    pub key: &'static str,
    pub query: &'static str,
}

/// Catalog cache statistics
#[derive(Debug, Serialize)]
pub struct CatalogStatsResponse {
    pub loaded: bool,
    pub total_products: usize,
    pub loaded_at: Option<DateTime<Utc>>,
    pub ttl_secs: u64,
}

/// Plain success acknowledgement
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
