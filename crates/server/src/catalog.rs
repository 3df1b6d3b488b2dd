//! Product catalog loaded from CSV and kept behind a TTL cache

use chrono::{DateTime, Utc};
use giftguide_common::{GiftGuideError, Result};
use giftguide_vector::ProductId;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Catalog row (`id_tovar,name,cleaned_description,oddelenie`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub id_tovar: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cleaned_description: Option<String>,
    #[serde(default)]
    pub oddelenie: Option<String>,
}

/// Products keyed by id
#[derive(Debug, Default)]
pub struct Catalog {
    products: HashMap<String, Product>,
}

impl Catalog {
    /// Read a catalog CSV with a header row
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            GiftGuideError::catalog(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let mut products = HashMap::new();
        for row in reader.deserialize::<Product>() {
            let mut product = row?;
            product.id_tovar = product.id_tovar.trim().to_string();
            if product.id_tovar.is_empty() {
                continue;
            }
            if products.contains_key(&product.id_tovar) {
                warn!("Duplicate catalog id {}, keeping first row", product.id_tovar);
                continue;
            }
            products.insert(product.id_tovar.clone(), product);
        }

        Ok(Self { products })
    }

    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|p| (p.id_tovar.clone(), p))
                .collect(),
        }
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(&id.to_string())
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// How long a failed load is reported before the file is read again
const FAILURE_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct CachedCatalog {
    catalog: Arc<Catalog>,
    loaded_at: Instant,
    loaded_at_utc: DateTime<Utc>,
}

#[derive(Default)]
struct CacheState {
    loaded: Option<CachedCatalog>,
    /// Time and message of the last failed load
    failed: Option<(Instant, String)>,
}

/// Catalog cache that reloads the CSV once the TTL has passed
pub struct CatalogCache {
    path: PathBuf,
    ttl: Duration,
    retry_after: Duration,
    state: RwLock<CacheState>,
}

impl CatalogCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            retry_after: FAILURE_BACKOFF,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Override how long a failed load is remembered
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fresh(&self, state: &CacheState) -> Option<Arc<Catalog>> {
        state
            .loaded
            .as_ref()
            .filter(|c| c.loaded_at.elapsed() < self.ttl)
            .map(|c| c.catalog.clone())
    }

    /// Current catalog, reloading it when missing or expired
    pub async fn get(&self) -> Result<Arc<Catalog>> {
        if let Some(catalog) = self.fresh(&*self.state.read().await) {
            return Ok(catalog);
        }

        let mut state = self.state.write().await;
        // another request may have reloaded while we waited for the lock
        if let Some(catalog) = self.fresh(&state) {
            return Ok(catalog);
        }

        if let Some((failed_at, reason)) = &state.failed {
            if failed_at.elapsed() < self.retry_after {
                return Err(GiftGuideError::catalog(format!(
                    "Not retrying yet, last load failed: {}",
                    reason
                )));
            }
        }

        // csv reads block; keep them off the async workers
        let path = self.path.clone();
        let loaded = tokio::task::spawn_blocking(move || Catalog::load(&path))
            .await
            .map_err(|e| GiftGuideError::internal(format!("Catalog load task failed: {}", e)))?;

        match loaded {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                info!("Catalog loaded: {} products from {}", catalog.len(), self.path.display());

                state.loaded = Some(CachedCatalog {
                    catalog: catalog.clone(),
                    loaded_at: Instant::now(),
                    loaded_at_utc: Utc::now(),
                });
                state.failed = None;

                Ok(catalog)
            }
            Err(e) => {
                warn!("Catalog load failed, retrying in {:?}: {}", self.retry_after, e);
                state.failed = Some((Instant::now(), e.to_string()));
                Err(e)
            }
        }
    }

    /// Drop the cached catalog and any remembered failure; the next `get` reads the file again
    pub async fn invalidate(&self) {
        *self.state.write().await = CacheState::default();
        info!("Catalog cache invalidated");
    }

    /// Product count and load time of the cached catalog, if any
    pub async fn stats(&self) -> Option<(usize, DateTime<Utc>)> {
        self.state
            .read()
            .await
            .loaded
            .as_ref()
            .map(|c| (c.catalog.len(), c.loaded_at_utc))
    }
}
