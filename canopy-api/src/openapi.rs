//! OpenAPI Specification for the Canopy API
//!
//! Uses utoipa to generate the OpenAPI document from Rust types and route
//! annotations; served at `/openapi.json`.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{health, survey, tree};
use crate::types::{
    CreateSurveyRequest, CreateTreeRequest, SurveyResponse, TreeResponse, UpdateSurveyRequest,
    UpdateTreeRequest,
};
use canopy_core::GeoLocation;

/// OpenAPI document for the Canopy API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Canopy API",
        version = "0.1.0",
        description = "Farm survey recording with per-survey tree observations and optimistic concurrency control on survey updates",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Surveys", description = "Farm survey records - the unit of conflict detection"),
        (name = "Trees", description = "Per-species tree observations owned by a survey"),
        (name = "Health", description = "Liveness and readiness probes")
    ),
    paths(
        survey::create_survey,
        survey::list_surveys,
        survey::get_survey,
        survey::update_survey,
        survey::delete_survey,
        tree::create_tree,
        tree::list_trees,
        tree::get_tree,
        tree::update_tree,
        tree::delete_tree,
        health::ping,
        health::ready,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        GeoLocation,
        CreateSurveyRequest,
        UpdateSurveyRequest,
        SurveyResponse,
        CreateTreeRequest,
        UpdateTreeRequest,
        TreeResponse,
        health::HealthResponse,
        health::HealthStatus,
    ))
)]
pub struct ApiDoc;
