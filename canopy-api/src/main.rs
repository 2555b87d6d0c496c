//! Canopy API Server Entry Point
//!
//! Bootstraps configuration, builds the selected storage backend, and starts
//! the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use canopy_api::{create_api_router, ApiConfig, ApiError, ApiResult, DbClient, DbConfig, StoreBackend};
use canopy_core::SystemClock;
use canopy_storage::{MemoryStorage, SurveyStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing();

    let api_config = ApiConfig::from_env();
    let clock = Arc::new(SystemClock);
    let policy = api_config.conflict_policy();

    let store: Arc<dyn SurveyStore> = match api_config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data will not survive a restart");
            Arc::new(MemoryStorage::new(clock, policy))
        }
        StoreBackend::Postgres => {
            let db_config = DbConfig::from_env();
            let db = DbClient::from_config(&db_config, clock, policy)?;
            db.migrate().await?;
            Arc::new(db)
        }
    };

    let app: Router = create_api_router(store, &api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "starting Canopy API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("CANOPY_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("CANOPY_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
