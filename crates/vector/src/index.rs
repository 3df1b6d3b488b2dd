use async_trait::async_trait;
use giftguide_common::Result;
use giftguide_embedding::EmbeddingVector;

use crate::types::IndexHit;

/// Nearest-neighbor index holding the product vectors
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Make a collection resident before searching; repeating the call is harmless
    async fn load(&self, collection: &str) -> Result<()>;

    /// Return at most `top_k` hits, closest first, in the order the index produced them
    async fn search(
        &self,
        vector: &EmbeddingVector,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<IndexHit>>;
}
