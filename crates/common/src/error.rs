/// GiftGuide error types
#[derive(Debug, thiserror::Error)]
pub enum GiftGuideError {
    /// Embedding service error (transport, auth, quota, malformed vector)
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector search error: {0}")]
    VectorSearch(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Product catalog error
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GiftGuideError {
    /// Create embedding error
    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create vector search error
    pub fn vector_search<S: Into<String>>(msg: S) -> Self {
        Self::VectorSearch(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create catalog error
    pub fn catalog<S: Into<String>>(msg: S) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

impl GiftGuideError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
            Self::Catalog(_) => 500,
            Self::Embedding(_) => 503,
            Self::VectorSearch(_) => 503,
            Self::Network(_) => 503,
            Self::Io(_) => 500,
            Self::Json(_) => 400,
            Self::Csv(_) => 500,
            Self::Other(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_map_to_variants() {
        assert!(matches!(GiftGuideError::embedding("x"), GiftGuideError::Embedding(_)));
        assert!(matches!(GiftGuideError::vector_search("x"), GiftGuideError::VectorSearch(_)));
        assert_eq!(
            GiftGuideError::config("bad port").to_string(),
            "Configuration error: bad port"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(GiftGuideError::invalid_input("q").status_code(), 400);
        assert_eq!(GiftGuideError::not_found("q").status_code(), 404);
        assert_eq!(GiftGuideError::embedding("down").status_code(), 503);
        assert_eq!(GiftGuideError::vector_search("down").status_code(), 503);
    }
}
