use actix_web::{get, web, HttpResponse};
use std::sync::Arc;

use crate::state::{AppState, Readiness};
use crate::types::HealthResponse;

/// Readiness of the search pipeline
#[get("/health")]
pub async fn health(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    match &state.readiness {
        Readiness::Ready(retriever) => Ok(HttpResponse::Ok().json(HealthResponse {
            status: "ready",
            embedding_model: Some(retriever.embedding_model().to_string()),
            collection: Some(retriever.settings().collection_name.clone()),
            error: None,
        })),
        Readiness::Degraded(reason) => Ok(HttpResponse::ServiceUnavailable().json(HealthResponse {
            status: "degraded",
            embedding_model: None,
            collection: None,
            error: Some(reason.clone()),
        })),
    }
}
