//! REST API Routes Module
//!
//! Route handlers organized by entity type, plus the assembled application
//! router with CORS, request tracing, and the OpenAPI document endpoint.

pub mod health;
pub mod survey;
pub mod tree;

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use canopy_storage::SurveyStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::openapi::ApiDoc;

// Re-export route creation functions for convenience
pub use health::create_router as health_router;
pub use survey::create_router as survey_router;
pub use tree::create_router as tree_router;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// CORS
// ============================================================================

/// Build the CORS layer: permissive when no origins are configured
/// (development), restricted to the configured list otherwise.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any)
    }
}

// ============================================================================
// APPLICATION ROUTER
// ============================================================================

/// Create the complete API router over the given store.
pub fn create_api_router(store: Arc<dyn SurveyStore>, config: &ApiConfig) -> Router {
    Router::new()
        .merge(survey::create_router(store.clone()))
        .merge(tree::create_router(store.clone()))
        .merge(health::create_router(store))
        .route("/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}
