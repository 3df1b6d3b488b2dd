use crate::category::CategoryTable;
use crate::error::GiftGuideError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which text is sent to the embedding model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedInput {
    /// The query exactly as the user typed it
    Raw,
    /// The normalized query
    Canonical,
}

impl FromStr for EmbedInput {
    type Err = GiftGuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "canonical" | "normalized" => Ok(Self::Canonical),
            other => Err(GiftGuideError::config(format!(
                "Unknown embed input '{}', expected raw or canonical",
                other
            ))),
        }
    }
}

/// Distance metric configured on the vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DistanceMetric {
    L2,
    IP,
    #[serde(rename = "COSINE")]
    Cosine,
}

impl DistanceMetric {
    /// Wire name used by the index service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L2 => "L2",
            Self::IP => "IP",
            Self::Cosine => "COSINE",
        }
    }

    /// Whether smaller distances mean closer matches
    pub fn lower_is_better(&self) -> bool {
        matches!(self, Self::L2)
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = GiftGuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "L2" => Ok(Self::L2),
            "IP" => Ok(Self::IP),
            "COSINE" => Ok(Self::Cosine),
            other => Err(GiftGuideError::config(format!("Unknown metric type '{}'", other))),
        }
    }
}

/// GiftGuide application configuration
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// API key for the embedding service
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Embedding service base URL
    pub openai_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Embedding dimensionality requested from the model and stored in the index
    pub embedding_dim: usize,

    /// Milvus host
    pub milvus_host: String,

    /// Milvus port
    pub milvus_port: u16,

    /// Milvus auth token (`user:password` or API key)
    #[serde(skip_serializing)]
    pub milvus_token: Option<String>,

    /// Collection holding the product vectors
    pub collection_name: String,

    /// Vector field searched in the collection
    pub anns_field: String,

    /// Scalar field holding the product id
    pub id_field: String,

    /// Scalar field holding the category code
    pub category_field: String,

    /// Distance metric of the collection index
    pub metric: DistanceMetric,

    /// Number of clusters probed per search
    pub nprobe: u32,

    /// How long to wait for a collection load to finish
    pub load_timeout_secs: u64,

    /// Which text gets embedded
    pub embed_input: EmbedInput,

    /// Longest accepted raw query, in characters
    pub max_query_length: usize,

    /// Results per query when the caller gives none
    pub default_top_k: usize,

    /// HTTP timeout for outbound calls
    pub request_timeout_secs: u64,

    /// Upper bound for each pipeline stage (embedding, search)
    pub stage_timeout_secs: u64,

    /// Category code labels
    pub categories: CategoryTable,

    /// Product catalog CSV
    pub products_csv_path: PathBuf,

    /// Catalog cache lifetime
    pub catalog_ttl_secs: u64,

    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_dim: 1024,
            milvus_host: "localhost".to_string(),
            milvus_port: 19530,
            milvus_token: None,
            collection_name: "ai_gift_recommender".to_string(),
            anns_field: "embedding".to_string(),
            id_field: "id_tovar".to_string(),
            category_field: "oddelenie".to_string(),
            metric: DistanceMetric::L2,
            nprobe: 15,
            load_timeout_secs: 60,
            embed_input: EmbedInput::Raw,
            max_query_length: 200,
            default_top_k: 20,
            request_timeout_secs: 30,
            stage_timeout_secs: 30,
            categories: CategoryTable::default(),
            products_csv_path: PathBuf::from("data/products.csv"),
            catalog_ttl_secs: 3600,
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, GiftGuideError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// Unset variables keep their defaults; set but unparsable ones are an error.
    pub fn from_vars<F>(lookup: F) -> Result<Self, GiftGuideError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let categories = match var("CATEGORY_LABELS") {
            Some(labels) => CategoryTable::parse(&labels)?,
            None => defaults.categories,
        };

        let config = Self {
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            embedding_model: var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dim: parse_var(&var, "EMBEDDING_DIM", defaults.embedding_dim)?,
            milvus_host: var("MILVUS_HOST").unwrap_or(defaults.milvus_host),
            milvus_port: parse_var(&var, "MILVUS_PORT", defaults.milvus_port)?,
            milvus_token: var("MILVUS_TOKEN"),
            collection_name: var("MILVUS_COLLECTION_NAME").unwrap_or(defaults.collection_name),
            anns_field: var("MILVUS_ANNS_FIELD").unwrap_or(defaults.anns_field),
            id_field: var("MILVUS_ID_FIELD").unwrap_or(defaults.id_field),
            category_field: var("MILVUS_CATEGORY_FIELD").unwrap_or(defaults.category_field),
            metric: parse_var(&var, "SEARCH_METRIC", defaults.metric)?,
            nprobe: parse_var(&var, "SEARCH_NPROBE", defaults.nprobe)?,
            load_timeout_secs: parse_var(&var, "LOAD_TIMEOUT_SECS", defaults.load_timeout_secs)?,
            embed_input: parse_var(&var, "EMBED_INPUT", defaults.embed_input)?,
            max_query_length: parse_var(&var, "MAX_QUERY_LENGTH", defaults.max_query_length)?,
            default_top_k: parse_var(&var, "DEFAULT_TOP_K", defaults.default_top_k)?,
            request_timeout_secs: parse_var(
                &var,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            stage_timeout_secs: parse_var(&var, "STAGE_TIMEOUT_SECS", defaults.stage_timeout_secs)?,
            categories,
            products_csv_path: var("PRODUCTS_CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.products_csv_path),
            catalog_ttl_secs: parse_var(&var, "CATALOG_TTL_SECS", defaults.catalog_ttl_secs)?,
            server_host: var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var(&var, "SERVER_PORT", defaults.server_port)?,
            log_dir: var("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        Ok(config)
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Base URL of the Milvus REST endpoint
    pub fn milvus_base_url(&self) -> String {
        if self.milvus_host.starts_with("http://") || self.milvus_host.starts_with("https://") {
            format!("{}:{}", self.milvus_host.trim_end_matches('/'), self.milvus_port)
        } else {
            format!("http://{}:{}", self.milvus_host, self.milvus_port)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), GiftGuideError> {
        if self.embedding_model.trim().is_empty() {
            return Err(GiftGuideError::config("Embedding model name cannot be empty"));
        }

        if self.embedding_dim == 0 {
            return Err(GiftGuideError::config("Embedding dimension must be positive"));
        }

        if !self.openai_base_url.starts_with("http://")
            && !self.openai_base_url.starts_with("https://")
        {
            return Err(GiftGuideError::config(
                "Embedding base URL must start with http:// or https://",
            ));
        }

        if self.collection_name.trim().is_empty() {
            return Err(GiftGuideError::config("Collection name cannot be empty"));
        }

        if self.nprobe == 0 {
            return Err(GiftGuideError::config("nprobe must be at least 1"));
        }

        if self.max_query_length == 0 {
            return Err(GiftGuideError::config("Max query length must be positive"));
        }

        if self.default_top_k == 0 {
            return Err(GiftGuideError::config("Default top_k must be at least 1"));
        }

        if self.server_port == 0 {
            return Err(GiftGuideError::config("Server port cannot be 0"));
        }

        Ok(())
    }
}

fn parse_var<F, T>(var: &F, key: &str, default: T) -> Result<T, GiftGuideError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            GiftGuideError::config(format!("Invalid value '{}' for {}: {}", raw, key, e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, GiftGuideError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding_dim, 1024);
        assert_eq!(config.collection_name, "ai_gift_recommender");
        assert_eq!(config.nprobe, 15);
        assert_eq!(config.max_query_length, 200);
        assert_eq!(config.metric, DistanceMetric::L2);
        assert_eq!(config.embed_input, EmbedInput::Raw);
    }

    #[test]
    fn test_server_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.server_bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_milvus_base_url() {
        let mut config = AppConfig::default();
        assert_eq!(config.milvus_base_url(), "http://localhost:19530");

        config.milvus_host = "https://milvus.internal/".to_string();
        assert_eq!(config.milvus_base_url(), "https://milvus.internal:19530");
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("EMBEDDING_DIM", "4"),
            ("MILVUS_PORT", "29530"),
            ("SEARCH_NPROBE", "32"),
            ("EMBED_INPUT", "canonical"),
            ("SEARCH_METRIC", "l2"),
            ("CATEGORY_LABELS", "5:Elektronika"),
        ])
        .unwrap();

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.embedding_dim, 4);
        assert_eq!(config.milvus_port, 29530);
        assert_eq!(config.nprobe, 32);
        assert_eq!(config.embed_input, EmbedInput::Canonical);
        assert_eq!(config.categories.label(Some(5)), "Elektronika");
        assert_eq!(config.categories.label(Some(0)), "Unknown");
    }

    #[test]
    fn test_from_vars_blank_values_keep_defaults() {
        let config = config_from(&[("MILVUS_HOST", "  "), ("OPENAI_API_KEY", "")]).unwrap();
        assert_eq!(config.milvus_host, "localhost");
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_from_vars_rejects_garbage() {
        assert!(config_from(&[("MILVUS_PORT", "not-a-port")]).is_err());
        assert!(config_from(&[("EMBED_INPUT", "lemmatized")]).is_err());
        assert!(config_from(&[("SEARCH_METRIC", "HAMMING")]).is_err());
        assert!(config_from(&[("CATEGORY_LABELS", "zero:Darčeky")]).is_err());
    }

    #[test]
    fn test_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = AppConfig::default();
        invalid_config.embedding_dim = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.nprobe = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.openai_base_url = "api.openai.com".to_string();
        assert!(invalid_config.validate().is_err());
    }
}
