use crate::types::EmbeddingVector;
use async_trait::async_trait;
use giftguide_common::Result;

/// Common trait for embedding backends
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text; success always carries exactly [`dimensions`](Self::dimensions) values
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Model name used for requests
    fn model(&self) -> &str;

    /// Output dimensionality
    fn dimensions(&self) -> usize;
}
