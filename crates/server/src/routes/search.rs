use actix_web::{get, web, HttpResponse};
use giftguide_vector::{NoSearchReason, RankedResult, RetrievalOutcome};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::state::AppState;
use crate::types::{ErrorResponse, NoSearchResponse, SearchQuery, SearchResponse, SearchResultItem};

const RETRY_MESSAGE: &str = "Failed to process your search query. Please try again.";
const NOT_READY_MESSAGE: &str = "Search is temporarily unavailable. Please try again later.";

#[get("/search")]
pub async fn search(
    query: web::Query<SearchQuery>,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    let Some(retriever) = state.retriever() else {
        return Ok(HttpResponse::ServiceUnavailable().json(ErrorResponse {
            status: "error",
            reason: None,
            message: NOT_READY_MESSAGE.to_string(),
        }));
    };

    let top_k = query.top_k.unwrap_or(retriever.settings().default_top_k);

    let result = match retriever.retrieve(&query.q, top_k).await {
        Ok(RetrievalOutcome::Ranked(result)) => result,
        Ok(RetrievalOutcome::NoSearch(reason)) => {
            return Ok(HttpResponse::Ok().json(NoSearchResponse {
                status: "no_search",
                reason,
                message: no_search_message(reason, retriever.settings().max_query_length),
            }));
        }
        Err(failure) => {
            return Ok(HttpResponse::ServiceUnavailable().json(ErrorResponse {
                status: "error",
                reason: Some(failure.reason),
                message: RETRY_MESSAGE.to_string(),
            }));
        }
    };

    // Left join: hits missing from the catalog keep empty display fields
    let catalog = match state.catalog.get().await {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("Catalog unavailable for join: {}", e);
            Arc::new(Catalog::default())
        }
    };

    let response = join_with_catalog(&query.q, result, &catalog);
    info!("Search '{}' returned {} products", query.q, response.count);

    Ok(HttpResponse::Ok().json(response))
}

fn join_with_catalog(query: &str, result: RankedResult, catalog: &Catalog) -> SearchResponse {
    let elapsed_ms = result.elapsed.as_millis();

    let results: Vec<SearchResultItem> = result
        .hits
        .into_iter()
        .map(|hit| {
            let product = catalog.get(&hit.product_id);
            SearchResultItem {
                name: product.and_then(|p| p.name.clone()),
                description: product.and_then(|p| p.cleaned_description.clone()),
                department: product.and_then(|p| p.oddelenie.clone()),
                product_id: hit.product_id,
                category: hit.category,
                distance: hit.distance,
            }
        })
        .collect();

    SearchResponse {
        status: "ok",
        query: query.to_string(),
        count: results.len(),
        elapsed_ms,
        results,
    }
}

fn no_search_message(reason: NoSearchReason, max_query_length: usize) -> String {
    match reason {
        NoSearchReason::EmptyQuery => {
            "Enter a search term or select one of the quick categories to get started!".to_string()
        }
        NoSearchReason::QueryTooLong => format!(
            "Search query is too long. Please limit to {} characters.",
            max_query_length
        ),
        NoSearchReason::NoMeaningfulText => {
            "Enter a search term containing letters or numbers.".to_string()
        }
    }
}
