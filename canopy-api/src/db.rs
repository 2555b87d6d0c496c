//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling via deadpool-postgres and the
//! `SurveyStore` implementation backed by plain parameterized SQL.
//!
//! Schema notes: ids are `BIGSERIAL` (assigned once, never reused within a
//! database), trees carry `REFERENCES farm_surveys ON DELETE CASCADE`, and
//! the cascade is still executed as an explicit delete-trees-then-survey
//! transaction so the constraint is a backstop rather than hidden
//! object-graph traversal.

use crate::error::{ApiError, ApiResult};
use canopy_core::{
    CanopyError, CanopyResult, Clock, EntityType, GeoLocation, NewSurvey, NewTree, StorageError,
    Survey, SurveyId, Timestamp, Tree, TreeId,
};
use canopy_storage::{ConflictPolicy, SurveyStore, SurveyUpdate, TreeUpdate};
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "canopy".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("CANOPY_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("CANOPY_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("CANOPY_DB_NAME").unwrap_or_else(|_| "canopy".to_string()),
            user: std::env::var("CANOPY_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("CANOPY_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("CANOPY_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("CANOPY_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS farm_surveys (
    survey_id    BIGSERIAL PRIMARY KEY,
    farmer_name  TEXT NOT NULL,
    crop_type    TEXT NOT NULL,
    latitude     DOUBLE PRECISION NOT NULL,
    longitude    DOUBLE PRECISION NOT NULL,
    sync_status  BOOLEAN NOT NULL DEFAULT FALSE,
    last_updated TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS trees (
    tree_id      BIGSERIAL PRIMARY KEY,
    survey_id    BIGINT NOT NULL REFERENCES farm_surveys(survey_id) ON DELETE CASCADE,
    species_name TEXT NOT NULL,
    tree_count   INTEGER NOT NULL CHECK (tree_count > 0),
    height_avg   DOUBLE PRECISION,
    diameter_avg DOUBLE PRECISION,
    age_avg      INTEGER,
    notes        TEXT,
    created_at   TIMESTAMPTZ NOT NULL,
    updated_at   TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_trees_survey_id ON trees(survey_id);
CREATE INDEX IF NOT EXISTS idx_farm_surveys_farmer_name ON farm_surveys(farmer_name);
"#;

// ============================================================================
// DATABASE CLIENT
// ============================================================================

/// Database client wrapping a connection pool, an injected clock, and the
/// conflict policy.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
    clock: Arc<dyn Clock>,
    policy: ConflictPolicy,
}

/// Mask a driver error into the domain taxonomy, logging the details.
fn db_error(err: tokio_postgres::Error) -> CanopyError {
    tracing::error!("Database error: {:?}", err);
    StorageError::TransactionFailed {
        reason: "database operation failed".to_string(),
    }
    .into()
}

fn pool_error(err: deadpool_postgres::PoolError) -> CanopyError {
    tracing::error!("Connection pool error: {:?}", err);
    StorageError::TransactionFailed {
        reason: "failed to acquire database connection".to_string(),
    }
    .into()
}

fn survey_from_row(row: &Row) -> Survey {
    Survey {
        survey_id: row.get("survey_id"),
        farmer_name: row.get("farmer_name"),
        crop_type: row.get("crop_type"),
        geo_location: GeoLocation {
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
        },
        sync_status: row.get("sync_status"),
        last_updated: row.get("last_updated"),
    }
}

fn tree_from_row(row: &Row) -> Tree {
    Tree {
        tree_id: row.get("tree_id"),
        survey_id: row.get("survey_id"),
        species_name: row.get("species_name"),
        tree_count: row.get("tree_count"),
        height_avg: row.get("height_avg"),
        diameter_avg: row.get("diameter_avg"),
        age_avg: row.get("age_avg"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl DbClient {
    /// Create a new database client with the given pool, clock, and policy.
    pub fn new(pool: Pool, clock: Arc<dyn Clock>, policy: ConflictPolicy) -> Self {
        Self {
            pool,
            clock,
            policy,
        }
    }

    /// Create a new database client from configuration.
    pub fn from_config(
        config: &DbConfig,
        clock: Arc<dyn Clock>,
        policy: ConflictPolicy,
    ) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool, clock, policy))
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> CanopyResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> ApiResult<()> {
        let conn = self.conn().await?;
        conn.batch_execute(SCHEMA)
            .await
            .map_err(ApiError::from)?;
        tracing::info!("database schema ensured");
        Ok(())
    }
}

#[async_trait::async_trait]
impl SurveyStore for DbClient {
    // === Survey Operations ===

    async fn survey_create(&self, new: NewSurvey) -> CanopyResult<Survey> {
        let conn = self.conn().await?;
        let now = self.clock.now();
        let row = conn
            .query_one(
                "INSERT INTO farm_surveys (farmer_name, crop_type, latitude, longitude, sync_status, last_updated)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING survey_id, farmer_name, crop_type, latitude, longitude, sync_status, last_updated",
                &[
                    &new.farmer_name,
                    &new.crop_type,
                    &new.geo_location.latitude,
                    &new.geo_location.longitude,
                    &new.sync_status,
                    &now,
                ],
            )
            .await
            .map_err(db_error)?;
        Ok(survey_from_row(&row))
    }

    async fn survey_get(&self, id: SurveyId) -> CanopyResult<Option<Survey>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT survey_id, farmer_name, crop_type, latitude, longitude, sync_status, last_updated
                 FROM farm_surveys WHERE survey_id = $1",
                &[&id],
            )
            .await
            .map_err(db_error)?;
        Ok(row.as_ref().map(survey_from_row))
    }

    async fn survey_list(&self, offset: i64, limit: i64) -> CanopyResult<Vec<Survey>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT survey_id, farmer_name, crop_type, latitude, longitude, sync_status, last_updated
                 FROM farm_surveys ORDER BY survey_id OFFSET $1 LIMIT $2",
                &[&offset.max(0), &limit.max(0)],
            )
            .await
            .map_err(db_error)?;
        Ok(rows.iter().map(survey_from_row).collect())
    }

    async fn survey_update(
        &self,
        id: SurveyId,
        update: SurveyUpdate,
        expected_last_updated: Option<Timestamp>,
    ) -> CanopyResult<Survey> {
        let mut conn = self.conn().await?;
        // One transaction encloses the conflict check and the write; FOR
        // UPDATE blocks concurrent writers on the same record until commit.
        let tx = conn.transaction().await.map_err(db_error)?;

        let row = tx
            .query_opt(
                "SELECT survey_id, farmer_name, crop_type, latitude, longitude, sync_status, last_updated
                 FROM farm_surveys WHERE survey_id = $1 FOR UPDATE",
                &[&id],
            )
            .await
            .map_err(db_error)?;

        let current = match row {
            Some(ref row) => survey_from_row(row),
            None => {
                return Err(StorageError::NotFound {
                    entity_type: EntityType::Survey,
                    id,
                }
                .into())
            }
        };

        if let Some(provided) = expected_last_updated {
            if self.policy.is_stale(current.last_updated, provided) {
                // Dropping the transaction rolls back; the record is untouched.
                return Err(StorageError::UpdateConflict {
                    entity_type: EntityType::Survey,
                    id,
                    stored: current.last_updated,
                    provided,
                }
                .into());
            }
        }

        let farmer_name = update.farmer_name.unwrap_or(current.farmer_name);
        let crop_type = update.crop_type.unwrap_or(current.crop_type);
        let geo_location = update.geo_location.unwrap_or(current.geo_location);
        let sync_status = update.sync_status.unwrap_or(current.sync_status);
        let now = self.clock.now();

        let row = tx
            .query_one(
                "UPDATE farm_surveys
                 SET farmer_name = $2, crop_type = $3, latitude = $4, longitude = $5,
                     sync_status = $6, last_updated = $7
                 WHERE survey_id = $1
                 RETURNING survey_id, farmer_name, crop_type, latitude, longitude, sync_status, last_updated",
                &[
                    &id,
                    &farmer_name,
                    &crop_type,
                    &geo_location.latitude,
                    &geo_location.longitude,
                    &sync_status,
                    &now,
                ],
            )
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(survey_from_row(&row))
    }

    async fn survey_delete(&self, id: SurveyId) -> CanopyResult<()> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await.map_err(db_error)?;

        let cascaded = tx
            .execute("DELETE FROM trees WHERE survey_id = $1", &[&id])
            .await
            .map_err(db_error)?;
        let deleted = tx
            .execute("DELETE FROM farm_surveys WHERE survey_id = $1", &[&id])
            .await
            .map_err(db_error)?;

        if deleted == 0 {
            return Err(StorageError::NotFound {
                entity_type: EntityType::Survey,
                id,
            }
            .into());
        }

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(survey_id = id, cascaded_trees = cascaded, "deleted survey");
        Ok(())
    }

    // === Tree Operations ===

    async fn tree_create(&self, new: NewTree) -> CanopyResult<Tree> {
        let mut conn = self.conn().await?;
        // Transactional so the existence check cannot race a concurrent
        // survey delete.
        let tx = conn.transaction().await.map_err(db_error)?;

        let survey = tx
            .query_opt(
                "SELECT survey_id FROM farm_surveys WHERE survey_id = $1 FOR SHARE",
                &[&new.survey_id],
            )
            .await
            .map_err(db_error)?;
        if survey.is_none() {
            return Err(StorageError::ConstraintViolation {
                constraint: "trees.survey_id".to_string(),
                reason: format!("survey {} does not exist", new.survey_id),
            }
            .into());
        }

        let now = self.clock.now();
        let row = tx
            .query_one(
                "INSERT INTO trees (survey_id, species_name, tree_count, height_avg, diameter_avg, age_avg, notes, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
                 RETURNING tree_id, survey_id, species_name, tree_count, height_avg, diameter_avg, age_avg, notes, created_at, updated_at",
                &[
                    &new.survey_id,
                    &new.species_name,
                    &new.tree_count,
                    &new.height_avg,
                    &new.diameter_avg,
                    &new.age_avg,
                    &new.notes,
                    &now,
                ],
            )
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(tree_from_row(&row))
    }

    async fn tree_get(&self, id: TreeId) -> CanopyResult<Option<Tree>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT tree_id, survey_id, species_name, tree_count, height_avg, diameter_avg, age_avg, notes, created_at, updated_at
                 FROM trees WHERE tree_id = $1",
                &[&id],
            )
            .await
            .map_err(db_error)?;
        Ok(row.as_ref().map(tree_from_row))
    }

    async fn tree_list_by_survey(&self, survey_id: SurveyId) -> CanopyResult<Vec<Tree>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT tree_id, survey_id, species_name, tree_count, height_avg, diameter_avg, age_avg, notes, created_at, updated_at
                 FROM trees WHERE survey_id = $1 ORDER BY tree_id",
                &[&survey_id],
            )
            .await
            .map_err(db_error)?;
        Ok(rows.iter().map(tree_from_row).collect())
    }

    async fn tree_update(&self, id: TreeId, update: TreeUpdate) -> CanopyResult<Tree> {
        let conn = self.conn().await?;
        let now = self.clock.now();
        // COALESCE keeps omitted fields at their stored values; update
        // payloads cannot null a column out.
        let row = conn
            .query_opt(
                "UPDATE trees
                 SET species_name = COALESCE($2, species_name),
                     tree_count   = COALESCE($3, tree_count),
                     height_avg   = COALESCE($4, height_avg),
                     diameter_avg = COALESCE($5, diameter_avg),
                     age_avg      = COALESCE($6, age_avg),
                     notes        = COALESCE($7, notes),
                     updated_at   = $8
                 WHERE tree_id = $1
                 RETURNING tree_id, survey_id, species_name, tree_count, height_avg, diameter_avg, age_avg, notes, created_at, updated_at",
                &[
                    &id,
                    &update.species_name,
                    &update.tree_count,
                    &update.height_avg,
                    &update.diameter_avg,
                    &update.age_avg,
                    &update.notes,
                    &now,
                ],
            )
            .await
            .map_err(db_error)?;

        match row {
            Some(ref row) => Ok(tree_from_row(row)),
            None => Err(StorageError::NotFound {
                entity_type: EntityType::Tree,
                id,
            }
            .into()),
        }
    }

    async fn tree_delete(&self, id: TreeId) -> CanopyResult<()> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute("DELETE FROM trees WHERE tree_id = $1", &[&id])
            .await
            .map_err(db_error)?;
        if deleted == 0 {
            return Err(StorageError::NotFound {
                entity_type: EntityType::Tree,
                id,
            }
            .into());
        }
        Ok(())
    }

    // === Health ===

    async fn ping(&self) -> CanopyResult<()> {
        let conn = self.conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(db_error)?;
        Ok(())
    }
}
