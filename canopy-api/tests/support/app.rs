//! Shared test application setup for integration tests.
//!
//! Builds the full API router over the in-memory store with a manual clock,
//! so conflict scenarios are deterministic.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use canopy_api::{create_api_router, ApiConfig};
use canopy_test_utils::{test_store, ManualClock};
use std::sync::Arc;

/// Full API router backed by `MemoryStorage`, plus the clock that drives it.
pub fn test_app() -> (axum::Router, Arc<ManualClock>) {
    let (store, clock) = test_store();
    let app = create_api_router(store, &ApiConfig::default());
    (app, clock)
}

/// Build a request carrying a JSON body.
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a body-less request.
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
pub async fn response_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
