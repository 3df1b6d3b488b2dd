use giftguide_common::GiftGuideError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Product key stored next to each vector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Int(i64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{}", id),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// One match returned by the vector index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexHit {
    /// Product identifier
    pub product_id: ProductId,

    /// Raw department code, absent when the entity has no such field
    pub category_code: Option<i64>,

    /// Distance to the query vector (lower is closer for L2)
    pub distance: f32,
}

impl IndexHit {
    pub fn new(product_id: impl Into<ProductId>, category_code: Option<i64>, distance: f32) -> Self {
        Self {
            product_id: product_id.into(),
            category_code,
            distance,
        }
    }
}

/// Hit with its category code resolved to a label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHit {
    pub product_id: ProductId,
    pub category_code: Option<i64>,
    pub category: String,
    pub distance: f32,
}

/// Ordered search results, best match first
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    /// Hits in index order
    pub hits: Vec<RankedHit>,

    /// Wall-clock time spent embedding and searching
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RankedResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Why a query was not searched at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoSearchReason {
    /// Blank query
    EmptyQuery,
    /// Query longer than the configured maximum
    QueryTooLong,
    /// Nothing left after normalization (only when canonical text is embedded)
    NoMeaningfulText,
}

impl fmt::Display for NoSearchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuery => f.write_str("empty query"),
            Self::QueryTooLong => f.write_str("query too long"),
            Self::NoMeaningfulText => f.write_str("no searchable text"),
        }
    }
}

/// Result of a retrieval that did not fail
#[derive(Debug, Clone)]
pub enum RetrievalOutcome {
    /// The query was rejected before any remote call
    NoSearch(NoSearchReason),
    /// Search ran; the result may still be empty
    Ranked(RankedResult),
}

impl RetrievalOutcome {
    /// Ranked hits, if a search ran
    pub fn ranked(&self) -> Option<&RankedResult> {
        match self {
            Self::Ranked(result) => Some(result),
            Self::NoSearch(_) => None,
        }
    }
}

/// Pipeline stage that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    EmbeddingFailed,
    SearchFailed,
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmbeddingFailed => f.write_str("embedding failed"),
            Self::SearchFailed => f.write_str("search failed"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Retrieval failure; callers branch on `reason`, `cause` is for logs
#[derive(Debug, thiserror::Error)]
#[error("Retrieval failed: {reason}")]
pub struct RetrievalFailure {
    pub reason: FailureReason,
    #[source]
    pub cause: GiftGuideError,
}

impl RetrievalFailure {
    pub fn new(reason: FailureReason, cause: GiftGuideError) -> Self {
        Self { reason, cause }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_display_and_serde() {
        assert_eq!(ProductId::from(101).to_string(), "101");
        assert_eq!(ProductId::from("A-7").to_string(), "A-7");

        let id: ProductId = serde_json::from_str("205").unwrap();
        assert_eq!(id, ProductId::Int(205));
        let id: ProductId = serde_json::from_str("\"205\"").unwrap();
        assert_eq!(id, ProductId::Text("205".to_string()));

        assert_eq!(serde_json::to_string(&ProductId::Int(7)).unwrap(), "7");
    }

    #[test]
    fn test_failure_message_hides_cause() {
        let failure = RetrievalFailure::new(
            FailureReason::EmbeddingFailed,
            GiftGuideError::embedding("401 Unauthorized"),
        );
        assert_eq!(failure.to_string(), "Retrieval failed: embedding failed");
        assert!(std::error::Error::source(&failure).is_some());
    }
}
