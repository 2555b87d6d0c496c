//! Tree REST API Routes
//!
//! Axum route handlers for tree operations. Creation and listing are scoped
//! under a survey (`/surveys/{id}/trees/`) and verify the survey exists
//! before touching the store; direct access by tree id lives under
//! `/trees/{id}`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use canopy_core::{NewTree, SurveyId, TreeId};
use canopy_storage::{SurveyStore, TreeUpdate};

use crate::{
    error::{ApiError, ApiResult},
    types::{CreateTreeRequest, TreeResponse, UpdateTreeRequest},
    validation::{ValidateNonEmpty, ValidateRange},
};

// ============================================================================
// SHARED STATE
// ============================================================================

/// Shared application state for tree routes.
#[derive(Clone)]
pub struct TreeState {
    pub store: Arc<dyn SurveyStore>,
}

impl TreeState {
    pub fn new(store: Arc<dyn SurveyStore>) -> Self {
        Self { store }
    }
}

/// Validate the numeric constraints shared by create and update payloads.
fn validate_measurements(
    height_avg: Option<f64>,
    diameter_avg: Option<f64>,
    age_avg: Option<i32>,
) -> ApiResult<()> {
    if let Some(height_avg) = height_avg {
        height_avg.validate_non_negative("height_avg")?;
    }
    if let Some(diameter_avg) = diameter_avg {
        diameter_avg.validate_non_negative("diameter_avg")?;
    }
    if let Some(age_avg) = age_avg {
        age_avg.validate_non_negative("age_avg")?;
    }
    Ok(())
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /surveys/{id}/trees/ - Create a tree record under a survey
#[utoipa::path(
    post,
    path = "/surveys/{id}/trees/",
    tag = "Trees",
    params(
        ("id" = i64, Path, description = "Owning survey id")
    ),
    request_body = CreateTreeRequest,
    responses(
        (status = 201, description = "Tree created successfully", body = TreeResponse),
        (status = 404, description = "Survey not found", body = ApiError),
        (status = 422, description = "Validation error", body = ApiError),
    )
)]
pub async fn create_tree(
    State(state): State<Arc<TreeState>>,
    Path(survey_id): Path<SurveyId>,
    Json(req): Json<CreateTreeRequest>,
) -> ApiResult<impl IntoResponse> {
    req.species_name.validate_non_empty("species_name")?;
    req.tree_count.validate_positive("tree_count")?;
    validate_measurements(req.height_avg, req.diameter_avg, req.age_avg)?;

    // Verify the owning survey exists before creating a child record.
    state
        .store
        .survey_get(survey_id)
        .await?
        .ok_or_else(|| ApiError::survey_not_found(survey_id))?;

    let tree = state
        .store
        .tree_create(NewTree {
            survey_id,
            species_name: req.species_name,
            tree_count: req.tree_count,
            height_avg: req.height_avg,
            diameter_avg: req.diameter_avg,
            age_avg: req.age_avg,
            notes: req.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TreeResponse::from(tree))))
}

/// GET /surveys/{id}/trees/ - List all trees recorded under a survey
#[utoipa::path(
    get,
    path = "/surveys/{id}/trees/",
    tag = "Trees",
    params(
        ("id" = i64, Path, description = "Owning survey id")
    ),
    responses(
        (status = 200, description = "List of trees", body = Vec<TreeResponse>),
        (status = 404, description = "Survey not found", body = ApiError),
    )
)]
pub async fn list_trees(
    State(state): State<Arc<TreeState>>,
    Path(survey_id): Path<SurveyId>,
) -> ApiResult<impl IntoResponse> {
    state
        .store
        .survey_get(survey_id)
        .await?
        .ok_or_else(|| ApiError::survey_not_found(survey_id))?;

    let trees = state.store.tree_list_by_survey(survey_id).await?;
    let responses: Vec<TreeResponse> = trees.into_iter().map(TreeResponse::from).collect();
    Ok(Json(responses))
}

/// GET /trees/{id} - Get a tree record by id
#[utoipa::path(
    get,
    path = "/trees/{id}",
    tag = "Trees",
    params(
        ("id" = i64, Path, description = "Tree id")
    ),
    responses(
        (status = 200, description = "Tree details", body = TreeResponse),
        (status = 404, description = "Tree not found", body = ApiError),
    )
)]
pub async fn get_tree(
    State(state): State<Arc<TreeState>>,
    Path(id): Path<TreeId>,
) -> ApiResult<impl IntoResponse> {
    let tree = state
        .store
        .tree_get(id)
        .await?
        .ok_or_else(|| ApiError::tree_not_found(id))?;

    Ok(Json(TreeResponse::from(tree)))
}

/// PUT /trees/{id} - Update a tree record
#[utoipa::path(
    put,
    path = "/trees/{id}",
    tag = "Trees",
    params(
        ("id" = i64, Path, description = "Tree id")
    ),
    request_body = UpdateTreeRequest,
    responses(
        (status = 200, description = "Tree updated successfully", body = TreeResponse),
        (status = 404, description = "Tree not found", body = ApiError),
        (status = 422, description = "Validation error", body = ApiError),
    )
)]
pub async fn update_tree(
    State(state): State<Arc<TreeState>>,
    Path(id): Path<TreeId>,
    Json(req): Json<UpdateTreeRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(ref species_name) = req.species_name {
        species_name.validate_non_empty("species_name")?;
    }
    if let Some(tree_count) = req.tree_count {
        tree_count.validate_positive("tree_count")?;
    }
    validate_measurements(req.height_avg, req.diameter_avg, req.age_avg)?;

    let tree = state
        .store
        .tree_update(
            id,
            TreeUpdate {
                species_name: req.species_name,
                tree_count: req.tree_count,
                height_avg: req.height_avg,
                diameter_avg: req.diameter_avg,
                age_avg: req.age_avg,
                notes: req.notes,
            },
        )
        .await?;

    Ok(Json(TreeResponse::from(tree)))
}

/// DELETE /trees/{id} - Delete a tree record
#[utoipa::path(
    delete,
    path = "/trees/{id}",
    tag = "Trees",
    params(
        ("id" = i64, Path, description = "Tree id")
    ),
    responses(
        (status = 204, description = "Tree deleted successfully"),
        (status = 404, description = "Tree not found", body = ApiError),
    )
)]
pub async fn delete_tree(
    State(state): State<Arc<TreeState>>,
    Path(id): Path<TreeId>,
) -> ApiResult<StatusCode> {
    state.store.tree_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the tree routes router: survey-scoped creation and listing plus
/// direct access by tree id. Collection endpoints are registered under both
/// spellings; axum does not redirect on trailing slashes.
pub fn create_router(store: Arc<dyn SurveyStore>) -> axum::Router {
    let state = Arc::new(TreeState::new(store));

    axum::Router::new()
        .route(
            "/surveys/:id/trees/",
            axum::routing::post(create_tree).get(list_trees),
        )
        .route(
            "/surveys/:id/trees",
            axum::routing::post(create_tree).get(list_trees),
        )
        .route(
            "/trees/:id",
            axum::routing::get(get_tree).put(update_tree).delete(delete_tree),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tree_request_validation() {
        let req = CreateTreeRequest {
            species_name: "Oak".to_string(),
            tree_count: 0,
            height_avg: Some(12.5),
            diameter_avg: None,
            age_avg: None,
            notes: None,
        };

        assert!(req.species_name.validate_non_empty("species_name").is_ok());
        assert!(req.tree_count.validate_positive("tree_count").is_err());
    }

    #[test]
    fn test_validate_measurements_rejects_negatives() {
        assert!(validate_measurements(Some(-1.0), None, None).is_err());
        assert!(validate_measurements(None, Some(-0.5), None).is_err());
        assert!(validate_measurements(None, None, Some(-2)).is_err());
        assert!(validate_measurements(Some(0.0), Some(0.0), Some(0)).is_ok());
        assert!(validate_measurements(None, None, None).is_ok());
    }
}
