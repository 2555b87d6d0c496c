//! Async storage trait for survey and tree persistence.
//!
//! Defines the store contract the API layer programs against. Implementations
//! must make every mutation a single atomic transaction; in particular the
//! conflict check and the write in `survey_update` must not be separable by
//! another writer on the same record.

use ::async_trait::async_trait;
use canopy_core::{CanopyResult, NewSurvey, NewTree, Survey, SurveyId, Timestamp, Tree, TreeId};

use crate::{SurveyUpdate, TreeUpdate};

/// Async storage trait for survey and tree operations.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    // ========================================================================
    // SURVEY OPERATIONS
    // ========================================================================

    /// Insert a new survey, assigning a fresh identifier and stamping
    /// `last_updated` from the store's clock.
    async fn survey_create(&self, new: NewSurvey) -> CanopyResult<Survey>;

    /// Get a survey by id.
    async fn survey_get(&self, id: SurveyId) -> CanopyResult<Option<Survey>>;

    /// List surveys in ascending id order. Ordering is consistent for an
    /// unchanged dataset; no other ordering guarantee is made.
    async fn survey_list(&self, offset: i64, limit: i64) -> CanopyResult<Vec<Survey>>;

    /// Apply a partial update to a survey.
    ///
    /// When `expected_last_updated` is supplied and diverges from the stored
    /// `last_updated` by more than the configured tolerance, fails with
    /// `StorageError::UpdateConflict` and leaves the record unmodified.
    /// `None` skips conflict detection entirely.
    async fn survey_update(
        &self,
        id: SurveyId,
        update: SurveyUpdate,
        expected_last_updated: Option<Timestamp>,
    ) -> CanopyResult<Survey>;

    /// Delete a survey together with all trees that reference it, atomically.
    async fn survey_delete(&self, id: SurveyId) -> CanopyResult<()>;

    // ========================================================================
    // TREE OPERATIONS
    // ========================================================================

    /// Insert a new tree. Fails with `StorageError::ConstraintViolation` when
    /// the referenced survey does not exist.
    async fn tree_create(&self, new: NewTree) -> CanopyResult<Tree>;

    /// Get a tree by id.
    async fn tree_get(&self, id: TreeId) -> CanopyResult<Option<Tree>>;

    /// List all trees belonging to a survey, in ascending id order.
    async fn tree_list_by_survey(&self, survey_id: SurveyId) -> CanopyResult<Vec<Tree>>;

    /// Apply a partial update to a tree and bump `updated_at`.
    async fn tree_update(&self, id: TreeId, update: TreeUpdate) -> CanopyResult<Tree>;

    /// Delete a tree.
    async fn tree_delete(&self, id: TreeId) -> CanopyResult<()>;

    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Backend liveness probe for health endpoints.
    async fn ping(&self) -> CanopyResult<()>;
}
