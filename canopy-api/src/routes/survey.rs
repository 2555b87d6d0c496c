//! Survey REST API Routes
//!
//! Axum route handlers for survey operations, including the conflict-aware
//! update: a client may supply its last-seen `last_updated` timestamp as a
//! query parameter and receives 409 when the stored record has moved on.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use canopy_core::{NewSurvey, Survey, SurveyId};
use canopy_storage::{SurveyStore, SurveyUpdate};

use crate::{
    error::{ApiError, ApiResult},
    types::{
        parse_client_timestamp, CreateSurveyRequest, ListSurveysParams, SurveyResponse,
        UpdateSurveyParams, UpdateSurveyRequest,
    },
    validation::{ValidateNonEmpty, ValidateRange},
};

/// Default page size when the client does not supply `limit`.
const DEFAULT_LIST_LIMIT: i64 = 100;

// ============================================================================
// SHARED STATE
// ============================================================================

/// Shared application state for survey routes.
#[derive(Clone)]
pub struct SurveyState {
    pub store: Arc<dyn SurveyStore>,
}

impl SurveyState {
    pub fn new(store: Arc<dyn SurveyStore>) -> Self {
        Self { store }
    }
}

/// Assemble the wire representation, embedding the survey's current trees.
async fn to_response(store: &dyn SurveyStore, survey: Survey) -> ApiResult<SurveyResponse> {
    let trees = store.tree_list_by_survey(survey.survey_id).await?;
    Ok(SurveyResponse::from_entity(survey, trees))
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /surveys/ - Create a new farm survey
#[utoipa::path(
    post,
    path = "/surveys/",
    tag = "Surveys",
    request_body = CreateSurveyRequest,
    responses(
        (status = 201, description = "Survey created successfully", body = SurveyResponse),
        (status = 422, description = "Validation error", body = ApiError),
    )
)]
pub async fn create_survey(
    State(state): State<Arc<SurveyState>>,
    Json(req): Json<CreateSurveyRequest>,
) -> ApiResult<impl IntoResponse> {
    req.farmer_name.validate_non_empty("farmer_name")?;
    req.crop_type.validate_non_empty("crop_type")?;
    req.geo_location.validate()?;

    let survey = state
        .store
        .survey_create(NewSurvey {
            farmer_name: req.farmer_name,
            crop_type: req.crop_type,
            geo_location: req.geo_location,
            sync_status: req.sync_status,
        })
        .await?;

    // A fresh survey has no trees yet; skip the lookup.
    let response = SurveyResponse::from_entity(survey, Vec::new());
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /surveys/ - List farm surveys with pagination
#[utoipa::path(
    get,
    path = "/surveys/",
    tag = "Surveys",
    params(
        ("skip" = Option<i64>, Query, description = "Number of records to skip (default 0)"),
        ("limit" = Option<i64>, Query, description = "Maximum number of records to return (default 100)"),
    ),
    responses(
        (status = 200, description = "List of surveys with embedded trees", body = Vec<SurveyResponse>),
        (status = 422, description = "Invalid pagination parameters", body = ApiError),
    )
)]
pub async fn list_surveys(
    State(state): State<Arc<SurveyState>>,
    Query(params): Query<ListSurveysParams>,
) -> ApiResult<impl IntoResponse> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    skip.validate_non_negative("skip")?;
    limit.validate_positive("limit")?;

    let surveys = state.store.survey_list(skip, limit).await?;

    let mut responses = Vec::with_capacity(surveys.len());
    for survey in surveys {
        responses.push(to_response(state.store.as_ref(), survey).await?);
    }

    Ok(Json(responses))
}

/// GET /surveys/{id} - Get a farm survey by id
#[utoipa::path(
    get,
    path = "/surveys/{id}",
    tag = "Surveys",
    params(
        ("id" = i64, Path, description = "Survey id")
    ),
    responses(
        (status = 200, description = "Survey details", body = SurveyResponse),
        (status = 404, description = "Survey not found", body = ApiError),
    )
)]
pub async fn get_survey(
    State(state): State<Arc<SurveyState>>,
    Path(id): Path<SurveyId>,
) -> ApiResult<impl IntoResponse> {
    let survey = state
        .store
        .survey_get(id)
        .await?
        .ok_or_else(|| ApiError::survey_not_found(id))?;

    Ok(Json(to_response(state.store.as_ref(), survey).await?))
}

/// PUT /surveys/{id} - Update a farm survey with conflict detection
///
/// When the `last_updated` query parameter is present, the update is
/// rejected with 409 if the stored timestamp diverges from it by more than
/// the configured tolerance. Absence of the parameter means an
/// unconditional overwrite.
#[utoipa::path(
    put,
    path = "/surveys/{id}",
    tag = "Surveys",
    params(
        ("id" = i64, Path, description = "Survey id"),
        ("last_updated" = Option<String>, Query, description = "Client-held last_updated timestamp for conflict detection"),
    ),
    request_body = UpdateSurveyRequest,
    responses(
        (status = 200, description = "Survey updated successfully", body = SurveyResponse),
        (status = 404, description = "Survey not found", body = ApiError),
        (status = 409, description = "Survey was modified since last read", body = ApiError),
        (status = 422, description = "Validation error", body = ApiError),
    )
)]
pub async fn update_survey(
    State(state): State<Arc<SurveyState>>,
    Path(id): Path<SurveyId>,
    Query(params): Query<UpdateSurveyParams>,
    Json(req): Json<UpdateSurveyRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(ref farmer_name) = req.farmer_name {
        farmer_name.validate_non_empty("farmer_name")?;
    }
    if let Some(ref crop_type) = req.crop_type {
        crop_type.validate_non_empty("crop_type")?;
    }
    if let Some(ref geo_location) = req.geo_location {
        geo_location.validate()?;
    }

    let expected_last_updated = params
        .last_updated
        .as_deref()
        .map(parse_client_timestamp)
        .transpose()?;

    let update = SurveyUpdate {
        farmer_name: req.farmer_name,
        crop_type: req.crop_type,
        geo_location: req.geo_location,
        sync_status: req.sync_status,
    };

    let survey = state
        .store
        .survey_update(id, update, expected_last_updated)
        .await?;

    Ok(Json(to_response(state.store.as_ref(), survey).await?))
}

/// DELETE /surveys/{id} - Delete a farm survey and all its trees
#[utoipa::path(
    delete,
    path = "/surveys/{id}",
    tag = "Surveys",
    params(
        ("id" = i64, Path, description = "Survey id")
    ),
    responses(
        (status = 204, description = "Survey deleted successfully"),
        (status = 404, description = "Survey not found", body = ApiError),
    )
)]
pub async fn delete_survey(
    State(state): State<Arc<SurveyState>>,
    Path(id): Path<SurveyId>,
) -> ApiResult<StatusCode> {
    state.store.survey_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the survey routes router.
///
/// The collection endpoints are registered under both spellings; axum does
/// not redirect on trailing slashes.
pub fn create_router(store: Arc<dyn SurveyStore>) -> axum::Router {
    let state = Arc::new(SurveyState::new(store));

    axum::Router::new()
        .route(
            "/surveys/",
            axum::routing::post(create_survey).get(list_surveys),
        )
        .route(
            "/surveys",
            axum::routing::post(create_survey).get(list_surveys),
        )
        .route(
            "/surveys/:id",
            axum::routing::get(get_survey)
                .put(update_survey)
                .delete(delete_survey),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::GeoLocation;

    #[test]
    fn test_create_survey_request_validation() {
        let req = CreateSurveyRequest {
            farmer_name: "".to_string(),
            crop_type: "Wheat".to_string(),
            geo_location: GeoLocation {
                latitude: 40.7128,
                longitude: -74.0060,
            },
            sync_status: false,
        };

        assert!(req.farmer_name.validate_non_empty("farmer_name").is_err());
        assert!(req.crop_type.validate_non_empty("crop_type").is_ok());
        assert!(req.geo_location.validate().is_ok());
    }

    #[test]
    fn test_update_survey_request_empty_payload_is_allowed() {
        // An empty update applies no field changes but still succeeds and
        // bumps the stored timestamp; there is no minimum-field rule.
        let req = UpdateSurveyRequest::default();
        assert!(req.farmer_name.is_none());
        assert!(req.crop_type.is_none());
        assert!(req.geo_location.is_none());
        assert!(req.sync_status.is_none());
    }

    #[test]
    fn test_list_params_defaults() {
        let params = ListSurveysParams::default();
        assert_eq!(params.skip.unwrap_or(0), 0);
        assert_eq!(params.limit.unwrap_or(DEFAULT_LIST_LIMIT), 100);
    }
}
