//! Milvus REST (v2) client

use async_trait::async_trait;
use giftguide_common::{AppConfig, DistanceMetric, GiftGuideError, Result};
use giftguide_embedding::EmbeddingVector;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::index::VectorIndex;
use crate::types::{IndexHit, ProductId};

const HAS_COLLECTION_PATH: &str = "/v2/vectordb/collections/has";
const LOAD_COLLECTION_PATH: &str = "/v2/vectordb/collections/load";
const LOAD_STATE_PATH: &str = "/v2/vectordb/collections/get_load_state";
const SEARCH_PATH: &str = "/v2/vectordb/entities/search";

const STATE_LOADED: &str = "LoadStateLoaded";
const STATE_NOT_EXIST: &str = "LoadStateNotExist";

/// Delay between load state polls
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Search settings fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct MilvusSearchSettings {
    /// Dimensionality of the collection's vector field
    pub dimensions: usize,
    pub anns_field: String,
    pub id_field: String,
    pub category_field: String,
    pub metric: DistanceMetric,
    /// Clusters probed per query
    pub nprobe: u32,
    pub load_timeout: Duration,
}

impl MilvusSearchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            dimensions: config.embedding_dim,
            anns_field: config.anns_field.clone(),
            id_field: config.id_field.clone(),
            category_field: config.category_field.clone(),
            metric: config.metric,
            nprobe: config.nprobe,
            load_timeout: config.load_timeout(),
        }
    }
}

/// Response envelope shared by every v2 endpoint
#[derive(Debug, Deserialize)]
struct MilvusResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

impl MilvusResponse {
    fn into_data(self, path: &str) -> Result<Value> {
        // older 2.4 builds answer 200 instead of 0
        if self.code == 0 || self.code == 200 {
            Ok(self.data)
        } else {
            Err(GiftGuideError::vector_search(format!(
                "Milvus {} failed (code {}): {}",
                path,
                self.code,
                self.message.unwrap_or_default()
            )))
        }
    }
}

/// Milvus vector index client
///
/// The underlying HTTP client pools connections and is safe to share across
/// concurrent searches.
pub struct MilvusIndex {
    base_url: String,
    client: Client,
    settings: MilvusSearchSettings,
    loaded: RwLock<HashSet<String>>,
}

impl MilvusIndex {
    /// Create client without contacting the server
    pub fn new(
        base_url: impl Into<String>,
        token: Option<&str>,
        settings: MilvusSearchSettings,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| GiftGuideError::config("Milvus token contains invalid characters"))?;
            headers.insert(AUTHORIZATION, auth);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GiftGuideError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            client,
            settings,
            loaded: RwLock::new(HashSet::new()),
        })
    }

    /// Connect to Milvus and check that the configured collection exists
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let index = Self::new(
            config.milvus_base_url(),
            config.milvus_token.as_deref(),
            MilvusSearchSettings::from_config(config),
            config.request_timeout(),
        )?;

        if !index.has_collection(&config.collection_name).await? {
            return Err(GiftGuideError::vector_search(format!(
                "Collection '{}' does not exist",
                config.collection_name
            )));
        }

        info!(
            "Milvus connected: {} (collection={}, metric={}, nprobe={})",
            index.base_url, config.collection_name, index.settings.metric, index.settings.nprobe
        );

        Ok(index)
    }

    pub fn settings(&self) -> &MilvusSearchSettings {
        &self.settings
    }

    /// Whether a collection exists
    pub async fn has_collection(&self, collection: &str) -> Result<bool> {
        let data = self
            .post(HAS_COLLECTION_PATH, &json!({ "collectionName": collection }))
            .await?;

        Ok(data.get("has").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Current load state string (e.g. `LoadStateLoaded`)
    async fn load_state(&self, collection: &str) -> Result<String> {
        let data = self
            .post(LOAD_STATE_PATH, &json!({ "collectionName": collection }))
            .await?;

        data.get("loadState")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GiftGuideError::vector_search("Load state missing from response"))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GiftGuideError::vector_search(format!("Failed to reach Milvus: {}", e)))?
            .error_for_status()
            .map_err(|e| GiftGuideError::vector_search(format!("Milvus HTTP error: {}", e)))?;

        let envelope: MilvusResponse = response.json().await.map_err(|e| {
            GiftGuideError::vector_search(format!("Failed to parse Milvus response: {}", e))
        })?;

        envelope.into_data(path)
    }

    fn check_preconditions(&self, vector: &EmbeddingVector, top_k: usize) -> Result<()> {
        if vector.len() != self.settings.dimensions {
            return Err(GiftGuideError::invalid_input(format!(
                "Query vector has {} dimensions, collection expects {}",
                vector.len(),
                self.settings.dimensions
            )));
        }
        if top_k == 0 {
            return Err(GiftGuideError::invalid_input("top_k must be at least 1"));
        }
        Ok(())
    }
}

/// Request body for a single-vector search
fn search_body(
    settings: &MilvusSearchSettings,
    collection: &str,
    vector: &EmbeddingVector,
    top_k: usize,
) -> Value {
    json!({
        "collectionName": collection,
        "data": [vector.as_slice()],
        "annsField": settings.anns_field,
        "limit": top_k,
        "outputFields": [settings.id_field, settings.category_field],
        "searchParams": {
            "metricType": settings.metric.as_str(),
            "params": { "nprobe": settings.nprobe },
        },
    })
}

/// Convert the `data` array of a search response into hits, keeping service order
fn parse_hits(settings: &MilvusSearchSettings, data: Value, top_k: usize) -> Result<Vec<IndexHit>> {
    let rows: Vec<Map<String, Value>> = serde_json::from_value(data).map_err(|e| {
        GiftGuideError::vector_search(format!("Malformed search result: {}", e))
    })?;

    let mut hits = Vec::with_capacity(rows.len().min(top_k));
    for row in rows.into_iter().take(top_k) {
        let product_id = match row.get(&settings.id_field) {
            Some(Value::Number(n)) => n.as_i64().map(ProductId::Int),
            Some(Value::String(s)) => Some(ProductId::Text(s.clone())),
            _ => None,
        }
        .ok_or_else(|| {
            GiftGuideError::vector_search(format!("Hit without '{}' field", settings.id_field))
        })?;

        let category_code = match row.get(&settings.category_field) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        let distance = row
            .get("distance")
            .and_then(Value::as_f64)
            .ok_or_else(|| GiftGuideError::vector_search("Hit without distance"))?
            as f32;

        hits.push(IndexHit {
            product_id,
            category_code,
            distance,
        });
    }

    if settings.metric.lower_is_better()
        && hits.windows(2).any(|w| w[0].distance > w[1].distance)
    {
        warn!("Milvus returned hits out of distance order; keeping service order");
    }

    Ok(hits)
}

#[async_trait]
impl VectorIndex for MilvusIndex {
    async fn load(&self, collection: &str) -> Result<()> {
        if self.loaded.read().await.contains(collection) {
            return Ok(());
        }

        info!("Loading collection: {}", collection);
        self.post(LOAD_COLLECTION_PATH, &json!({ "collectionName": collection }))
            .await?;

        let deadline = Instant::now() + self.settings.load_timeout;
        loop {
            let state = self.load_state(collection).await?;
            match state.as_str() {
                STATE_LOADED => break,
                STATE_NOT_EXIST => {
                    return Err(GiftGuideError::vector_search(format!(
                        "Collection '{}' does not exist",
                        collection
                    )));
                }
                _ if Instant::now() >= deadline => {
                    return Err(GiftGuideError::vector_search(format!(
                        "Collection '{}' not loaded after {:?} (state {})",
                        collection, self.settings.load_timeout, state
                    )));
                }
                _ => {
                    debug!("Collection {} load state: {}", collection, state);
                    tokio::time::sleep(LOAD_POLL_INTERVAL).await;
                }
            }
        }

        self.loaded.write().await.insert(collection.to_string());
        info!("Collection loaded: {}", collection);
        Ok(())
    }

    async fn search(
        &self,
        vector: &EmbeddingVector,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<IndexHit>> {
        self.check_preconditions(vector, top_k)?;
        self.load(collection).await?;

        debug!("Searching {} (top_k={}, nprobe={})", collection, top_k, self.settings.nprobe);

        let body = search_body(&self.settings, collection, vector, top_k);
        let data = self.post(SEARCH_PATH, &body).await?;
        let hits = parse_hits(&self.settings, data, top_k)?;

        debug!("Milvus returned {} hits", hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dimensions: usize) -> MilvusSearchSettings {
        let mut config = AppConfig::default();
        config.embedding_dim = dimensions;
        MilvusSearchSettings::from_config(&config)
    }

    fn vector() -> EmbeddingVector {
        EmbeddingVector::new(vec![0.1, 0.2, 0.3, 0.4], 4).unwrap()
    }

    #[test]
    fn test_search_body() {
        let body = search_body(&settings(4), "ai_gift_recommender", &vector(), 5);

        assert_eq!(body["collectionName"], "ai_gift_recommender");
        assert_eq!(body["annsField"], "embedding");
        assert_eq!(body["limit"], 5);
        assert_eq!(body["outputFields"], json!(["id_tovar", "oddelenie"]));
        assert_eq!(body["searchParams"]["metricType"], "L2");
        assert_eq!(body["searchParams"]["params"]["nprobe"], 15);
        assert_eq!(body["data"][0].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_hits_keeps_order_and_fields() {
        let data = json!([
            {"id": 1, "distance": 0.12, "id_tovar": 101, "oddelenie": 3},
            {"id": 2, "distance": 0.31, "id_tovar": "205", "oddelenie": "0"},
            {"id": 3, "distance": 0.40, "id_tovar": 300}
        ]);

        let hits = parse_hits(&settings(4), data, 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0], IndexHit::new(101, Some(3), 0.12));
        assert_eq!(hits[1].product_id, ProductId::Text("205".to_string()));
        assert_eq!(hits[1].category_code, Some(0));
        assert_eq!(hits[2].category_code, None);
    }

    #[test]
    fn test_parse_hits_does_not_resort() {
        let data = json!([
            {"distance": 0.9, "id_tovar": 1, "oddelenie": 0},
            {"distance": 0.1, "id_tovar": 2, "oddelenie": 0}
        ]);

        let hits = parse_hits(&settings(4), data, 10).unwrap();
        assert_eq!(hits[0].product_id, ProductId::Int(1));
        assert_eq!(hits[1].product_id, ProductId::Int(2));
    }

    #[test]
    fn test_parse_hits_truncates_to_top_k() {
        let data = json!([
            {"distance": 0.1, "id_tovar": 1},
            {"distance": 0.2, "id_tovar": 2},
            {"distance": 0.3, "id_tovar": 3}
        ]);

        let hits = parse_hits(&settings(4), data, 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].product_id, ProductId::Int(2));
    }

    #[test]
    fn test_parse_hits_rejects_malformed() {
        let missing_id = json!([{"distance": 0.1, "oddelenie": 1}]);
        assert!(parse_hits(&settings(4), missing_id, 5).is_err());

        let missing_distance = json!([{"id_tovar": 1}]);
        assert!(parse_hits(&settings(4), missing_distance, 5).is_err());

        assert!(parse_hits(&settings(4), json!({"unexpected": true}), 5).is_err());
    }

    #[test]
    fn test_envelope_codes() {
        let ok: MilvusResponse = serde_json::from_str(r#"{"code":0,"data":{"has":true}}"#).unwrap();
        assert_eq!(ok.into_data("/x").unwrap()["has"], true);

        let legacy: MilvusResponse = serde_json::from_str(r#"{"code":200,"data":[]}"#).unwrap();
        assert!(legacy.into_data("/x").is_ok());

        let err: MilvusResponse =
            serde_json::from_str(r#"{"code":100,"message":"collection not found"}"#).unwrap();
        let err = err.into_data("/x").unwrap_err();
        assert!(matches!(err, GiftGuideError::VectorSearch(_)));
        assert!(err.to_string().contains("collection not found"));
    }

    #[tokio::test]
    async fn test_search_preconditions() {
        let index = MilvusIndex::new(
            "http://127.0.0.1:9",
            None,
            settings(8),
            Duration::from_secs(1),
        )
        .unwrap();

        let err = index.search(&vector(), "c", 5).await.unwrap_err();
        assert!(matches!(err, GiftGuideError::InvalidInput(_)));

        let index = MilvusIndex::new(
            "http://127.0.0.1:9",
            None,
            settings(4),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = index.search(&vector(), "c", 0).await.unwrap_err();
        assert!(matches!(err, GiftGuideError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_search_error() {
        let index = MilvusIndex::new(
            "http://127.0.0.1:9",
            Some("root:Milvus"),
            settings(4),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = index.search(&vector(), "c", 5).await.unwrap_err();
        assert!(matches!(err, GiftGuideError::VectorSearch(_)));
    }

    mod fake_server {
        use super::*;
        use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Mutex;

        /// In-process stand-in for the Milvus REST endpoints
        struct FakeMilvus {
            has: bool,
            /// Successive answers of `get_load_state`; the last one repeats
            states: Vec<&'static str>,
            search_code: i64,
            load_calls: AtomicUsize,
            state_calls: AtomicUsize,
            search_bodies: Mutex<Vec<Value>>,
        }

        impl FakeMilvus {
            fn new(states: Vec<&'static str>) -> Self {
                Self {
                    has: true,
                    states,
                    search_code: 0,
                    load_calls: AtomicUsize::new(0),
                    state_calls: AtomicUsize::new(0),
                    search_bodies: Mutex::new(Vec::new()),
                }
            }
        }

        async fn fake_milvus(
            req: HttpRequest,
            body: web::Bytes,
            fake: web::Data<FakeMilvus>,
        ) -> HttpResponse {
            let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

            let reply = match req.path() {
                HAS_COLLECTION_PATH => json!({"code": 0, "data": {"has": fake.has}}),
                LOAD_COLLECTION_PATH => {
                    fake.load_calls.fetch_add(1, Ordering::SeqCst);
                    json!({"code": 0, "data": {}})
                }
                LOAD_STATE_PATH => {
                    let call = fake.state_calls.fetch_add(1, Ordering::SeqCst);
                    let state = fake.states[call.min(fake.states.len() - 1)];
                    json!({"code": 0, "data": {"loadState": state}})
                }
                SEARCH_PATH => {
                    fake.search_bodies.lock().unwrap().push(body);
                    if fake.search_code != 0 {
                        json!({"code": fake.search_code, "message": "collection not loaded"})
                    } else {
                        json!({"code": 0, "data": [
                            {"id": 1, "distance": 0.12, "id_tovar": 101, "oddelenie": 3},
                            {"id": 2, "distance": 0.31, "id_tovar": 205, "oddelenie": 0}
                        ]})
                    }
                }
                _ => return HttpResponse::NotFound().finish(),
            };

            HttpResponse::Ok().json(reply)
        }

        /// Serve `fake` on an ephemeral port and return its address
        fn spawn(fake: FakeMilvus) -> (std::net::SocketAddr, web::Data<FakeMilvus>) {
            let fake = web::Data::new(fake);
            let data = fake.clone();

            let server = HttpServer::new(move || {
                App::new()
                    .app_data(data.clone())
                    .default_service(web::to(fake_milvus))
            })
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();

            let addr = server.addrs()[0];
            actix_web::rt::spawn(server.run());
            (addr, fake)
        }

        fn index(addr: std::net::SocketAddr, load_timeout: Duration) -> MilvusIndex {
            let mut settings = settings(4);
            settings.load_timeout = load_timeout;
            MilvusIndex::new(format!("http://{}", addr), None, settings, Duration::from_secs(5))
                .unwrap()
        }

        #[actix_web::test]
        async fn test_load_is_sent_once() {
            let (addr, fake) = spawn(FakeMilvus::new(vec!["LoadStateLoading", STATE_LOADED]));
            let index = index(addr, Duration::from_secs(10));

            index.load("c").await.unwrap();
            index.load("c").await.unwrap();
            assert_eq!(fake.load_calls.load(Ordering::SeqCst), 1);
            assert_eq!(fake.state_calls.load(Ordering::SeqCst), 2);

            let hits = index.search(&vector(), "c", 5).await.unwrap();
            assert_eq!(
                hits,
                vec![IndexHit::new(101, Some(3), 0.12), IndexHit::new(205, Some(0), 0.31)]
            );
            let hits = index.search(&vector(), "c", 1).await.unwrap();
            assert_eq!(hits.len(), 1);

            // searches reuse the loaded collection
            assert_eq!(fake.load_calls.load(Ordering::SeqCst), 1);

            let bodies = fake.search_bodies.lock().unwrap();
            assert_eq!(bodies.len(), 2);
            assert_eq!(bodies[0]["collectionName"], "c");
            assert_eq!(bodies[0]["limit"], 5);
            assert_eq!(bodies[0]["searchParams"]["params"]["nprobe"], 15);
            assert_eq!(bodies[1]["limit"], 1);
        }

        #[actix_web::test]
        async fn test_missing_collection_on_load() {
            let (addr, _fake) = spawn(FakeMilvus::new(vec![STATE_NOT_EXIST]));
            let index = index(addr, Duration::from_secs(10));

            let err = index.load("c").await.unwrap_err();
            assert!(matches!(err, GiftGuideError::VectorSearch(_)));
            assert!(err.to_string().contains("does not exist"));
        }

        #[actix_web::test]
        async fn test_load_times_out() {
            let (addr, fake) = spawn(FakeMilvus::new(vec!["LoadStateLoading"]));
            let index = index(addr, Duration::from_millis(200));

            let started = Instant::now();
            let err = index.load("c").await.unwrap_err();
            assert!(matches!(err, GiftGuideError::VectorSearch(_)));
            assert!(err.to_string().contains("not loaded"));
            assert!(started.elapsed() >= Duration::from_millis(200));
            assert!(fake.state_calls.load(Ordering::SeqCst) >= 2);

            // a failed load is not remembered
            assert!(index.load("c").await.is_err());
            assert_eq!(fake.load_calls.load(Ordering::SeqCst), 2);
        }

        #[actix_web::test]
        async fn test_connect_checks_collection() {
            let mut missing = FakeMilvus::new(vec![STATE_LOADED]);
            missing.has = false;
            let (addr, _fake) = spawn(missing);

            let mut config = AppConfig::default();
            config.embedding_dim = 4;
            config.milvus_host = addr.ip().to_string();
            config.milvus_port = addr.port();

            let err = MilvusIndex::connect(&config).await.err().unwrap();
            assert!(matches!(err, GiftGuideError::VectorSearch(_)));

            let (addr, _fake) = spawn(FakeMilvus::new(vec![STATE_LOADED]));
            config.milvus_port = addr.port();
            let index = MilvusIndex::connect(&config).await.unwrap();
            assert!(index.has_collection("ai_gift_recommender").await.unwrap());
        }

        #[actix_web::test]
        async fn test_error_code_is_search_error() {
            let mut failing = FakeMilvus::new(vec![STATE_LOADED]);
            failing.search_code = 65535;
            let (addr, _fake) = spawn(failing);
            let index = index(addr, Duration::from_secs(10));

            let err = index.search(&vector(), "c", 5).await.unwrap_err();
            assert!(matches!(err, GiftGuideError::VectorSearch(_)));
            assert!(err.to_string().contains("collection not loaded"));
        }
    }
}
