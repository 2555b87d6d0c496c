//! Canopy Test Utilities
//!
//! Centralized test infrastructure for the Canopy workspace:
//! - Fixture constructors for surveys and trees
//! - A fixed-epoch manual clock for deterministic conflict scenarios
//! - Proptest strategies for coordinates and names

// Re-export the in-memory store from its source crate
pub use canopy_storage::{ConflictPolicy, MemoryStorage, SurveyStore, SurveyUpdate, TreeUpdate};

// Re-export core types for convenience
pub use canopy_core::{
    CanopyError, CanopyResult, Clock, EntityType, GeoLocation, ManualClock, NewSurvey, NewTree,
    StorageError, Survey, SurveyId, SystemClock, Timestamp, Tree, TreeId, ValidationError,
};

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// FIXTURES
// ============================================================================

/// Fixed reference instant used as the starting point of test clocks.
pub fn epoch() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
}

/// Manual clock starting at [`epoch`].
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(epoch()))
}

/// In-memory store wired to a manual clock and the default 1-second
/// conflict tolerance.
pub fn test_store() -> (Arc<MemoryStorage>, Arc<ManualClock>) {
    let clock = test_clock();
    let store = Arc::new(MemoryStorage::new(clock.clone(), ConflictPolicy::default()));
    (store, clock)
}

/// A valid survey creation payload.
pub fn sample_survey() -> NewSurvey {
    NewSurvey {
        farmer_name: "John Doe".to_string(),
        crop_type: "Wheat".to_string(),
        geo_location: GeoLocation {
            latitude: 40.7128,
            longitude: -74.0060,
        },
        sync_status: false,
    }
}

/// A valid tree creation payload for the given survey.
pub fn sample_tree(survey_id: SurveyId) -> NewTree {
    NewTree {
        survey_id,
        species_name: "Oak".to_string(),
        tree_count: 25,
        height_avg: Some(12.5),
        diameter_avg: Some(45.0),
        age_avg: Some(15),
        notes: Some("Mature trees in good condition".to_string()),
    }
}

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

/// Strategy for latitudes inside the declared range.
pub fn valid_latitude() -> impl Strategy<Value = f64> {
    -90.0..=90.0
}

/// Strategy for longitudes inside the declared range.
pub fn valid_longitude() -> impl Strategy<Value = f64> {
    -180.0..=180.0
}

/// Strategy for latitudes outside the declared range.
pub fn out_of_range_latitude() -> impl Strategy<Value = f64> {
    prop_oneof![90.0001..=1_000.0, -1_000.0..=-90.0001]
}

/// Strategy for longitudes outside the declared range.
pub fn out_of_range_longitude() -> impl Strategy<Value = f64> {
    prop_oneof![180.0001..=1_000.0, -1_000.0..=-180.0001]
}

/// Strategy for valid geo locations.
pub fn geo_location_strategy() -> impl Strategy<Value = GeoLocation> {
    (valid_latitude(), valid_longitude()).prop_map(|(latitude, longitude)| GeoLocation {
        latitude,
        longitude,
    })
}

/// Strategy for farmer names: always non-empty after trimming.
pub fn farmer_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z]{1,12}( [A-Za-z]{1,12})?"
}

/// Strategy for tree species names.
pub fn species_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Oak".to_string()),
        Just("Maple".to_string()),
        Just("Pine".to_string()),
        Just("Baobab".to_string()),
        Just("Eucalyptus".to_string()),
        "[A-Za-z]{3,15}",
    ]
}

/// Strategy for positive tree counts.
pub fn tree_count_strategy() -> impl Strategy<Value = i32> {
    1..10_000_i32
}
