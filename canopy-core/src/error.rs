//! Error types for Canopy operations

use crate::{EntityType, Timestamp};
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: i64 },

    /// Optimistic concurrency failure: the client-held timestamp diverged
    /// from the stored one by more than the configured tolerance.
    #[error("Update conflict on {entity_type:?} {id}: record was modified since last read (stored {stored}, client supplied {provided})")]
    UpdateConflict {
        entity_type: EntityType,
        id: i64,
        stored: Timestamp,
        provided: Timestamp,
    },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required field missing or empty: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Value for {field} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Canopy operations.
#[derive(Debug, Clone, Error)]
pub enum CanopyError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Canopy operations.
pub type CanopyResult<T> = Result<T, CanopyError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound {
            entity_type: EntityType::Survey,
            id: 42,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Survey"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_update_conflict_display_mentions_conflict() {
        let stored = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let provided = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let err = StorageError::UpdateConflict {
            entity_type: EntityType::Survey,
            id: 7,
            stored,
            provided,
        };
        let msg = format!("{}", err).to_lowercase();
        assert!(msg.contains("conflict"));
        assert!(msg.contains("modified since last read"));
    }

    #[test]
    fn test_validation_error_display_out_of_range() {
        let err = ValidationError::OutOfRange {
            field: "latitude".to_string(),
            value: 91.0,
            min: -90.0,
            max: 90.0,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("latitude"));
        assert!(msg.contains("91"));
        assert!(msg.contains("-90"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "port".to_string(),
            value: "not-a-port".to_string(),
            reason: "must be numeric".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("port"));
        assert!(msg.contains("not-a-port"));
        assert!(msg.contains("must be numeric"));
    }

    #[test]
    fn test_canopy_error_from_variants() {
        let storage = CanopyError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, CanopyError::Storage(_)));

        let validation = CanopyError::from(ValidationError::RequiredFieldMissing {
            field: "farmer_name".to_string(),
        });
        assert!(matches!(validation, CanopyError::Validation(_)));

        let config = CanopyError::from(ConfigError::MissingRequired {
            field: "host".to_string(),
        });
        assert!(matches!(config, CanopyError::Config(_)));
    }
}
