//! Health Check Endpoints
//!
//! - /health/ping - liveness check, no store access
//! - /health/ready - store connectivity check

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use canopy_storage::SurveyStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn SurveyStore>,
}

impl HealthState {
    pub fn new(store: Arc<dyn SurveyStore>) -> Self {
        Self { store }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple liveness check
#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse),
    )
)]
pub async fn ping() -> impl IntoResponse {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        message: None,
    })
}

/// GET /health/ready - Store connectivity check
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Store is reachable", body = HealthResponse),
        (status = 503, description = "Store is unreachable", body = HealthResponse),
    )
)]
pub async fn ready(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: HealthStatus::Healthy,
                message: None,
            }),
        ),
        Err(err) => {
            tracing::warn!("readiness probe failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: HealthStatus::Unhealthy,
                    message: Some(err.to_string()),
                }),
            )
        }
    }
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the health routes router.
pub fn create_router(store: Arc<dyn SurveyStore>) -> Router {
    let state = Arc::new(HealthState::new(store));

    Router::new()
        .route("/health/ping", get(ping))
        .route("/health/ready", get(ready))
        .with_state(state)
}
