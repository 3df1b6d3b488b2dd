use async_trait::async_trait;
use giftguide_common::{AppConfig, GiftGuideError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::embedder::EmbeddingClient;
use crate::types::{EmbedRequest, EmbedResponse, EmbeddingVector};

/// Longest error body kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// OpenAI-compatible embeddings client
///
/// One HTTP request per [`embed`](EmbeddingClient::embed) call. No caching,
/// batching or retries happen here.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    endpoint: String,
    model: String,
    dimensions: usize,
    client: Client,
}

impl OpenAiEmbedder {
    /// Create new embeddings client
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let model = model.into();

        if api_key.trim().is_empty() {
            return Err(GiftGuideError::config("Missing embedding API key (OPENAI_API_KEY)"));
        }
        if model.trim().is_empty() {
            return Err(GiftGuideError::config("Missing embedding model name"));
        }
        if dimensions == 0 {
            return Err(GiftGuideError::config("Embedding dimension must be positive"));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| GiftGuideError::config("Embedding API key contains invalid characters"))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GiftGuideError::config(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));

        info!("Embedding client initialized: model={}, dimensions={}, endpoint={}", model, dimensions, endpoint);

        Ok(Self {
            endpoint,
            model,
            dimensions,
            client,
        })
    }

    /// Create client from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_deref()
            .ok_or_else(|| GiftGuideError::config("Missing embedding API key (OPENAI_API_KEY)"))?;

        Self::new(
            api_key,
            &config.openai_base_url,
            config.embedding_model.clone(),
            config.embedding_dim,
            config.request_timeout(),
        )
    }

    /// Single request to the embeddings endpoint
    async fn try_embed(&self, request: &EmbedRequest) -> anyhow::Result<EmbedResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send embedding request: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            anyhow::bail!("Embedding API error ({}): {}", status, body);
        }

        response
            .json::<EmbedResponse>()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse embedding response: {}", e))
    }
}

/// Pull the single vector out of a response and check its dimensionality
fn extract_vector(response: EmbedResponse, dimensions: usize) -> Result<EmbeddingVector> {
    let data = response
        .data
        .into_iter()
        .min_by_key(|d| d.index)
        .ok_or_else(|| GiftGuideError::embedding("Empty embedding response"))?;

    EmbeddingVector::new(data.embedding, dimensions)
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        debug!("Generating embedding - Model: {}, Text length: {}", self.model, text.len());

        let request = EmbedRequest {
            model: self.model.clone(),
            input: text.to_string(),
            dimensions: Some(self.dimensions),
        };

        let response = self
            .try_embed(&request)
            .await
            .map_err(|e| GiftGuideError::embedding(e.to_string()))?;

        let vector = extract_vector(response, self.dimensions)?;
        debug!("Received embedding - Dimension: {}", vector.len());

        Ok(vector)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
