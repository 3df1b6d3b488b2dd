//! GiftGuide embedding integration
//!
//! Embedding client trait and the OpenAI-compatible HTTP client

mod client;
mod embedder;
mod types;

pub use client::OpenAiEmbedder;
pub use embedder::EmbeddingClient;
pub use types::{EmbedRequest, EmbedResponse, EmbeddingData, EmbeddingVector};
