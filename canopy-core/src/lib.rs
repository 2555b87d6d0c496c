//! Canopy Core - Entity Types, Validation, and Errors
//!
//! Shared domain types for the Canopy farm survey service: the `Survey` and
//! `Tree` entities, their creation payloads and validation rules, the error
//! taxonomy used across the workspace, and the clock abstraction that keeps
//! timestamp generation injectable.

pub mod clock;
pub mod entities;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entities::{EntityType, GeoLocation, NewSurvey, NewTree, Survey, Tree};
pub use error::{CanopyError, CanopyResult, ConfigError, StorageError, ValidationError};

use chrono::{DateTime, Utc};

/// Identifier for a survey record. Assigned by the store, never reused.
pub type SurveyId = i64;

/// Identifier for a tree record. Assigned by the store, never reused.
pub type TreeId = i64;

/// Timestamp type used across all entities (UTC).
pub type Timestamp = DateTime<Utc>;

/// Inclusive latitude bounds in degrees.
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);

/// Inclusive longitude bounds in degrees.
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);
