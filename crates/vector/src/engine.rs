use giftguide_common::{AppConfig, CategoryTable, EmbedInput, GiftGuideError, Result};
use giftguide_embedding::{EmbeddingClient, OpenAiEmbedder};
use giftguide_text::normalize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::index::VectorIndex;
use crate::milvus::MilvusIndex;
use crate::types::{
    FailureReason, IndexHit, NoSearchReason, RankedHit, RankedResult, RetrievalFailure,
    RetrievalOutcome,
};

/// Largest `top_k` passed to the index (Milvus rejects bigger limits)
pub const MAX_TOP_K: usize = 16_384;

/// Retrieval policy fixed at startup
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub collection_name: String,
    pub max_query_length: usize,
    pub default_top_k: usize,
    pub embed_input: EmbedInput,
    pub stage_timeout: Duration,
    pub categories: CategoryTable,
}

impl RetrievalSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            collection_name: config.collection_name.clone(),
            max_query_length: config.max_query_length,
            default_top_k: config.default_top_k,
            embed_input: config.embed_input,
            stage_timeout: config.stage_timeout(),
            categories: config.categories.clone(),
        }
    }
}

/// Query → ranked products pipeline
///
/// normalize → embed → search → label. Collaborators are injected once and
/// shared; the retriever holds no per-request state and can serve concurrent
/// callers through an `Arc`.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    settings: RetrievalSettings,
}

impl Retriever {
    /// Create retriever from already constructed collaborators
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            settings,
        }
    }

    /// Build the production retriever: embedding client, Milvus connection, collection load
    ///
    /// Any error here means the process cannot search.
    pub async fn initialize(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let embedder = OpenAiEmbedder::from_config(config)?;
        let index = MilvusIndex::connect(config).await?;
        index.load(&config.collection_name).await?;

        info!(
            "Retriever initialized - model={}, collection={}, embed_input={:?}",
            config.embedding_model, config.collection_name, config.embed_input
        );

        Ok(Self::new(
            Arc::new(embedder),
            Arc::new(index),
            RetrievalSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model()
    }

    pub fn embedding_dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Reject queries that should not be searched; checked on the raw text
    pub fn screen_query(&self, raw_query: &str) -> Option<NoSearchReason> {
        // whitespace-only input counts as empty
        if raw_query.trim().is_empty() {
            Some(NoSearchReason::EmptyQuery)
        } else if raw_query.chars().count() > self.settings.max_query_length {
            Some(NoSearchReason::QueryTooLong)
        } else {
            None
        }
    }

    /// Run the pipeline for one query
    pub async fn retrieve(
        &self,
        raw_query: &str,
        top_k: usize,
    ) -> std::result::Result<RetrievalOutcome, RetrievalFailure> {
        self.retrieve_with_cancel(raw_query, top_k, &CancellationToken::new())
            .await
    }

    /// Run the pipeline, abandoning the in-flight remote call when `cancel` fires
    pub async fn retrieve_with_cancel(
        &self,
        raw_query: &str,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> std::result::Result<RetrievalOutcome, RetrievalFailure> {
        if let Some(reason) = self.screen_query(raw_query) {
            debug!("Query not searched: {}", reason);
            return Ok(RetrievalOutcome::NoSearch(reason));
        }

        let started = Instant::now();
        let canonical = normalize(raw_query);
        debug!("Canonical query: {:?}", canonical);

        let embed_text = match self.settings.embed_input {
            EmbedInput::Raw => raw_query,
            EmbedInput::Canonical if canonical.is_empty() => {
                debug!("Query not searched: {}", NoSearchReason::NoMeaningfulText);
                return Ok(RetrievalOutcome::NoSearch(NoSearchReason::NoMeaningfulText));
            }
            EmbedInput::Canonical => canonical.as_str(),
        };

        let vector = self
            .run_stage(FailureReason::EmbeddingFailed, cancel, self.embedder.embed(embed_text))
            .await?;

        let top_k = top_k.clamp(1, MAX_TOP_K);
        let hits = self
            .run_stage(
                FailureReason::SearchFailed,
                cancel,
                self.index
                    .search(&vector, &self.settings.collection_name, top_k),
            )
            .await?;

        let result = RankedResult {
            hits: self.label_hits(hits),
            elapsed: started.elapsed(),
        };

        info!(
            "Search completed - {} results in {:.2?} (top_k={})",
            result.len(),
            result.elapsed,
            top_k
        );

        Ok(RetrievalOutcome::Ranked(result))
    }

    /// Resolve category codes, keeping index order
    fn label_hits(&self, hits: Vec<IndexHit>) -> Vec<RankedHit> {
        hits.into_iter()
            .map(|hit| RankedHit {
                category: self.settings.categories.label(hit.category_code).to_string(),
                product_id: hit.product_id,
                category_code: hit.category_code,
                distance: hit.distance,
            })
            .collect()
    }

    /// Await one remote stage under the stage timeout and the cancellation token
    async fn run_stage<T, F>(
        &self,
        reason: FailureReason,
        cancel: &CancellationToken,
        stage: F,
    ) -> std::result::Result<T, RetrievalFailure>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.settings.stage_timeout;

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("Retrieval cancelled during {}", stage_name(reason));
                Err(RetrievalFailure::new(
                    FailureReason::Cancelled,
                    GiftGuideError::internal("Request cancelled"),
                ))
            }
            outcome = tokio::time::timeout(timeout, stage) => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    error!("{} failed: {}", stage_name(reason), e);
                    Err(RetrievalFailure::new(reason, e))
                }
                Err(_) => {
                    error!("{} timed out after {:?}", stage_name(reason), timeout);
                    Err(RetrievalFailure::new(
                        reason,
                        GiftGuideError::network(format!("Timed out after {:?}", timeout)),
                    ))
                }
            },
        }
    }
}

fn stage_name(reason: FailureReason) -> &'static str {
    match reason {
        FailureReason::EmbeddingFailed => "Embedding",
        FailureReason::SearchFailed => "Vector search",
        FailureReason::Cancelled => "Retrieval",
    }
}
