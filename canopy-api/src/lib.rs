//! Canopy API - REST Layer
//!
//! Axum REST API for the Canopy farm survey service. Route handlers resolve
//! identifiers, run validation, invoke the storage trait, and translate
//! store outcomes (not-found, conflict, validation) into HTTP responses.
//! The PostgreSQL-backed store implementation lives in [`db`]; the in-memory
//! backend from `canopy-storage` can be selected for local development.

pub mod config;
pub mod db;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::{ApiConfig, StoreBackend};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use types::*;
