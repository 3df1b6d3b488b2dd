use actix_web::{get, post, web, HttpResponse};
use std::sync::Arc;
use tracing::info;

use crate::state::AppState;
use crate::types::{CatalogStatsResponse, SuccessResponse};

/// Get catalog cache statistics
#[get("/catalog/stats")]
pub async fn catalog_stats(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    let stats = state.catalog.stats().await;

    Ok(HttpResponse::Ok().json(CatalogStatsResponse {
        loaded: stats.is_some(),
        total_products: stats.map(|(count, _)| count).unwrap_or(0),
        loaded_at: stats.map(|(_, at)| at),
        ttl_secs: state.catalog.ttl().as_secs(),
    }))
}

/// Drop the cached catalog so the next search rereads the CSV
#[post("/catalog/reload")]
pub async fn catalog_reload(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    info!("Catalog reload requested");
    state.catalog.invalidate().await;

    Ok(HttpResponse::Ok().json(SuccessResponse {
        success: true,
        message: Some("Catalog cache cleared".to_string()),
    }))
}
