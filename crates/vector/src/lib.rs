//! GiftGuide vector retrieval
//!
//! Nearest-neighbor index client (Milvus) and the query → ranked products pipeline

pub mod engine;
pub mod index;
pub mod milvus;
pub mod types;

pub use engine::{RetrievalSettings, Retriever, MAX_TOP_K};
pub use index::VectorIndex;
pub use milvus::{MilvusIndex, MilvusSearchSettings};
pub use types::{
    FailureReason, IndexHit, NoSearchReason, ProductId, RankedHit, RankedResult,
    RetrievalFailure, RetrievalOutcome,
};
