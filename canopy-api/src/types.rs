//! API Request and Response Types
//!
//! Defines the wire representation of surveys and trees plus the query
//! parameter structs used by the REST endpoints.

use crate::error::ApiError;
use canopy_core::{GeoLocation, Survey, SurveyId, Timestamp, Tree, TreeId};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// SURVEY TYPES
// ============================================================================

/// Request to create a new survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateSurveyRequest {
    /// Name of the farmer
    pub farmer_name: String,
    /// Type of crop
    pub crop_type: String,
    /// Geographic location (latitude and longitude)
    pub geo_location: GeoLocation,
    /// Synchronization status, defaults to false when omitted
    #[serde(default)]
    pub sync_status: bool,
}

/// Request to update an existing survey. Omitted fields keep their stored
/// values; `sync_status: false` supplied explicitly is a real overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateSurveyRequest {
    pub farmer_name: Option<String>,
    pub crop_type: Option<String>,
    pub geo_location: Option<GeoLocation>,
    pub sync_status: Option<bool>,
}

/// Survey representation returned by the API, with embedded trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SurveyResponse {
    pub survey_id: SurveyId,
    pub farmer_name: String,
    pub crop_type: String,
    pub geo_location: GeoLocation,
    pub sync_status: bool,
    /// Timestamp of last update, used for conflict resolution
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub last_updated: Timestamp,
    /// Trees recorded under this survey
    #[serde(default)]
    pub trees: Vec<TreeResponse>,
}

impl SurveyResponse {
    /// Build the wire representation from a stored survey and its current
    /// tree list.
    pub fn from_entity(survey: Survey, trees: Vec<Tree>) -> Self {
        Self {
            survey_id: survey.survey_id,
            farmer_name: survey.farmer_name,
            crop_type: survey.crop_type,
            geo_location: survey.geo_location,
            sync_status: survey.sync_status,
            last_updated: survey.last_updated,
            trees: trees.into_iter().map(TreeResponse::from).collect(),
        }
    }
}

/// Query parameters for survey listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListSurveysParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Query parameters for survey update.
///
/// `last_updated` is the client-held timestamp for conflict detection;
/// absence skips the conflict check entirely.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateSurveyParams {
    pub last_updated: Option<String>,
}

// ============================================================================
// TREE TYPES
// ============================================================================

/// Request to create a new tree under a survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateTreeRequest {
    /// Name of the tree species
    pub species_name: String,
    /// Number of trees of this species, must be positive
    pub tree_count: i32,
    /// Average height in meters
    pub height_avg: Option<f64>,
    /// Average diameter in centimeters
    pub diameter_avg: Option<f64>,
    /// Average age in years
    pub age_avg: Option<i32>,
    /// Additional notes about the trees
    pub notes: Option<String>,
}

/// Request to update an existing tree. Omitted fields keep their stored
/// values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateTreeRequest {
    pub species_name: Option<String>,
    pub tree_count: Option<i32>,
    pub height_avg: Option<f64>,
    pub diameter_avg: Option<f64>,
    pub age_avg: Option<i32>,
    pub notes: Option<String>,
}

/// Tree representation returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TreeResponse {
    pub tree_id: TreeId,
    pub survey_id: SurveyId,
    pub species_name: String,
    pub tree_count: i32,
    pub height_avg: Option<f64>,
    pub diameter_avg: Option<f64>,
    pub age_avg: Option<i32>,
    pub notes: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl From<Tree> for TreeResponse {
    fn from(tree: Tree) -> Self {
        Self {
            tree_id: tree.tree_id,
            survey_id: tree.survey_id,
            species_name: tree.species_name,
            tree_count: tree.tree_count,
            height_avg: tree.height_avg,
            diameter_avg: tree.diameter_avg,
            age_avg: tree.age_avg,
            notes: tree.notes,
            created_at: tree.created_at,
            updated_at: tree.updated_at,
        }
    }
}

// ============================================================================
// TIMESTAMP PARSING
// ============================================================================

/// Parse a client-supplied timestamp.
///
/// Accepts RFC 3339 (`2024-01-15T10:30:00Z`, with or without fractional
/// seconds) and the naive `2024-01-15T10:30:00[.ffffff]` form, which is
/// interpreted as UTC. Offline clients echo back whichever spelling the
/// server handed them.
pub fn parse_client_timestamp(raw: &str) -> Result<Timestamp, ApiError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(ApiError::invalid_format(
        "last_updated",
        "an RFC 3339 or YYYY-MM-DDTHH:MM:SS timestamp",
    ))
}
