use giftguide_common::{GiftGuideError, Result};
use serde::{Deserialize, Serialize};

/// Embedding vector with a fixed, validated dimensionality
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Wrap raw values, rejecting anything that is not exactly `dimensions` long
    pub fn new(values: Vec<f32>, dimensions: usize) -> Result<Self> {
        if values.len() != dimensions {
            return Err(GiftGuideError::embedding(format!(
                "Expected {} dimensions, got {}",
                dimensions,
                values.len()
            )));
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(GiftGuideError::embedding("Embedding contains non-finite values"));
        }

        Ok(Self(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// OpenAI embeddings request
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    /// Model name (e.g., "text-embedding-3-large")
    pub model: String,

    /// Text to embed
    pub input: String,

    /// Requested output dimensionality
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

/// OpenAI embeddings response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    /// One entry per input
    #[serde(default)]
    pub data: Vec<EmbeddingData>,

    /// Model that served the request
    #[serde(default)]
    pub model: Option<String>,
}

/// Single embedding in a response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,

    #[serde(default)]
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_dimension_is_enforced() {
        let vector = EmbeddingVector::new(vec![0.1, 0.2, 0.3, 0.4], 4).unwrap();
        assert_eq!(vector.len(), 4);
        assert_eq!(vector.as_slice(), &[0.1, 0.2, 0.3, 0.4]);

        assert!(EmbeddingVector::new(vec![0.1, 0.2], 4).is_err());
        assert!(EmbeddingVector::new(Vec::new(), 4).is_err());
    }

    #[test]
    fn test_vector_rejects_nan() {
        assert!(EmbeddingVector::new(vec![0.1, f32::NAN], 2).is_err());
    }

    #[test]
    fn test_request_serialization() {
        let request = EmbedRequest {
            model: "text-embedding-3-large".to_string(),
            input: "harry potter knihy".to_string(),
            dimensions: Some(1024),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-3-large");
        assert_eq!(json["input"], "harry potter knihy");
        assert_eq!(json["dimensions"], 1024);

        let request = EmbedRequest { dimensions: None, ..request };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("dimensions").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.5, -0.25]}],
            "model": "text-embedding-3-large",
            "usage": {"prompt_tokens": 3, "total_tokens": 3}
        }"#;
        let response: EmbedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].embedding, vec![0.5, -0.25]);
        assert_eq!(response.model.as_deref(), Some("text-embedding-3-large"));
    }
}
