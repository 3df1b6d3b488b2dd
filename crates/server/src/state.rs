use giftguide_common::AppConfig;
use giftguide_vector::Retriever;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::catalog::CatalogCache;

/// Whether the search pipeline came up
pub enum Readiness {
    Ready(Arc<Retriever>),
    /// Initialization failed; requests are refused with the stored reason
    Degraded(String),
}

/// Shared application state
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Retrieval pipeline, or why it is unavailable
    pub readiness: Readiness,

    /// Product catalog
    pub catalog: CatalogCache,
}

impl AppState {
    /// Create state around an already initialized (or failed) retriever
    pub fn new(config: AppConfig, readiness: Readiness) -> Self {
        let catalog = CatalogCache::new(config.products_csv_path.clone(), config.catalog_ttl());

        Self {
            config,
            readiness,
            catalog,
        }
    }

    /// Initialize the retriever and warm the catalog
    ///
    /// Failures do not abort startup: the server stays up and reports itself as
    /// degraded so the outage is visible instead of a crash loop.
    pub async fn initialize(config: AppConfig) -> Self {
        let readiness = match Retriever::initialize(&config).await {
            Ok(retriever) => Readiness::Ready(Arc::new(retriever)),
            Err(e) => {
                error!("Failed to initialize search pipeline: {}", e);
                Readiness::Degraded(e.to_string())
            }
        };

        let state = Self::new(config, readiness);

        match state.catalog.get().await {
            Ok(catalog) => info!("Catalog ready: {} products", catalog.len()),
            Err(e) => warn!("Catalog unavailable, results will lack display fields: {}", e),
        }

        state
    }

    pub fn retriever(&self) -> Option<&Arc<Retriever>> {
        match &self.readiness {
            Readiness::Ready(retriever) => Some(retriever),
            Readiness::Degraded(_) => None,
        }
    }
}
