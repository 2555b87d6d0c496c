//! API Configuration Module
//!
//! Configuration for CORS, conflict tolerance, and store backend selection.
//! Loaded from environment variables with sensible defaults for development.

use canopy_storage::ConflictPolicy;

/// Which storage backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// PostgreSQL-backed store (production).
    #[default]
    Postgres,
    /// In-memory store for local development; data dies with the process.
    Memory,
}

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Tolerance in milliseconds for the optimistic-concurrency timestamp
    /// comparison on survey updates.
    pub conflict_tolerance_ms: i64,

    /// Storage backend to run against.
    pub store_backend: StoreBackend,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(), // Empty = allow all
            conflict_tolerance_ms: 1_000,
            store_backend: StoreBackend::Postgres,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CANOPY_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `CANOPY_CONFLICT_TOLERANCE_MS`: Conflict tolerance in milliseconds (default: 1000)
    /// - `CANOPY_STORE`: "postgres" (default) or "memory"
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CANOPY_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let conflict_tolerance_ms = std::env::var("CANOPY_CONFLICT_TOLERANCE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1_000);

        let store_backend = match std::env::var("CANOPY_STORE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            _ => StoreBackend::Postgres,
        };

        Self {
            cors_origins,
            conflict_tolerance_ms,
            store_backend,
        }
    }

    /// Conflict policy derived from the configured tolerance.
    pub fn conflict_policy(&self) -> ConflictPolicy {
        ConflictPolicy::with_tolerance_ms(self.conflict_tolerance_ms)
    }
}
