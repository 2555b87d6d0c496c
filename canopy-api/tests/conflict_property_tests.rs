//! Property-Based Tests for the Conflict-Aware Update Protocol
//!
//! For any client timestamp within the tolerance of the stored one, an
//! update SHALL succeed; for any timestamp beyond it, the update SHALL fail
//! with a conflict and leave the record unchanged. Creation SHALL echo any
//! valid geo-location exactly.

use axum::http::StatusCode;
use canopy_test_utils::{
    farmer_name_strategy, geo_location_strategy, sample_survey, test_store, CanopyError,
    StorageError, SurveyStore, SurveyUpdate,
};
use chrono::Duration;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use serde_json::json;
use tokio::runtime::Runtime;
use tower::ServiceExt;

#[path = "support/app.rs"]
mod support;
use support::{json_request, response_json, test_app};

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn updates_within_tolerance_always_succeed(drift_ms in -1000_i64..=1000) {
        let rt = test_runtime()?;
        let ok = rt.block_on(async move {
            let (store, _clock) = test_store();
            let survey = store.survey_create(sample_survey()).await.unwrap();
            let expected = survey.last_updated + Duration::milliseconds(drift_ms);
            store
                .survey_update(survey.survey_id, SurveyUpdate::default(), Some(expected))
                .await
                .is_ok()
        });
        prop_assert!(ok);
    }

    #[test]
    fn updates_beyond_tolerance_always_conflict(
        drift_ms in 1001_i64..=86_400_000,
        ahead in proptest::bool::ANY,
    ) {
        let rt = test_runtime()?;
        let (conflicted, unchanged) = rt.block_on(async move {
            let (store, _clock) = test_store();
            let survey = store.survey_create(sample_survey()).await.unwrap();
            let delta = Duration::milliseconds(if ahead { drift_ms } else { -drift_ms });
            let result = store
                .survey_update(
                    survey.survey_id,
                    SurveyUpdate {
                        farmer_name: Some("Changed".to_string()),
                        ..Default::default()
                    },
                    Some(survey.last_updated + delta),
                )
                .await;
            let conflicted = matches!(
                result,
                Err(CanopyError::Storage(StorageError::UpdateConflict { .. }))
            );
            let stored = store.survey_get(survey.survey_id).await.unwrap().unwrap();
            (conflicted, stored == survey)
        });
        prop_assert!(conflicted);
        prop_assert!(unchanged);
    }

    #[test]
    fn created_surveys_echo_their_geo_location(
        geo in geo_location_strategy(),
        name in farmer_name_strategy(),
    ) {
        let rt = test_runtime()?;
        let echoed = rt.block_on(async move {
            let (app, _clock) = test_app();
            let response = app
                .oneshot(json_request(
                    "POST",
                    "/surveys/",
                    json!({
                        "farmer_name": name,
                        "crop_type": "Wheat",
                        "geo_location": {
                            "latitude": geo.latitude,
                            "longitude": geo.longitude,
                        },
                    }),
                ))
                .await
                .unwrap();
            if response.status() != StatusCode::CREATED {
                return false;
            }
            let body = response_json(response).await;
            body["geo_location"]["latitude"].as_f64() == Some(geo.latitude)
                && body["geo_location"]["longitude"].as_f64() == Some(geo.longitude)
        });
        prop_assert!(echoed);
    }
}
