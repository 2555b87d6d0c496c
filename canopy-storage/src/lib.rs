//! Canopy Storage - Storage Trait and In-Memory Backend
//!
//! Defines the storage abstraction for Canopy entities plus the in-memory
//! backend used by tests and local development. The PostgreSQL-backed
//! implementation lives in `canopy-api::db`.

pub mod async_trait;

pub use async_trait::SurveyStore;

use ::async_trait::async_trait;
use canopy_core::{
    CanopyResult, Clock, EntityType, GeoLocation, NewSurvey, NewTree, StorageError, Survey,
    SurveyId, Timestamp, Tree, TreeId,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Partial-update payload for surveys.
///
/// `None` means "leave the stored value untouched"; `Some(value)` is a real
/// overwrite. `Some(false)` for `sync_status` is therefore distinct from
/// omission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyUpdate {
    pub farmer_name: Option<String>,
    pub crop_type: Option<String>,
    pub geo_location: Option<GeoLocation>,
    pub sync_status: Option<bool>,
}

impl SurveyUpdate {
    /// Whether the payload carries no field changes at all.
    pub fn is_empty(&self) -> bool {
        self.farmer_name.is_none()
            && self.crop_type.is_none()
            && self.geo_location.is_none()
            && self.sync_status.is_none()
    }
}

/// Partial-update payload for trees. Same `None`-means-untouched semantics
/// as [`SurveyUpdate`]; optional measurements cannot be nulled out, only
/// overwritten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeUpdate {
    pub species_name: Option<String>,
    pub tree_count: Option<i32>,
    pub height_avg: Option<f64>,
    pub diameter_avg: Option<f64>,
    pub age_avg: Option<i32>,
    pub notes: Option<String>,
}

// ============================================================================
// CONFLICT POLICY
// ============================================================================

/// Tolerance applied when comparing a client-held `last_updated` timestamp
/// against the stored one. The window absorbs serialization and precision
/// drift between client and server clocks; it is not a staleness TTL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConflictPolicy {
    pub tolerance: chrono::Duration,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            tolerance: chrono::Duration::seconds(1),
        }
    }
}

impl ConflictPolicy {
    pub fn with_tolerance_ms(ms: i64) -> Self {
        Self {
            tolerance: chrono::Duration::milliseconds(ms),
        }
    }

    /// Whether a client-held timestamp is stale relative to the stored one.
    pub fn is_stale(&self, stored: Timestamp, provided: Timestamp) -> bool {
        (stored - provided).abs() > self.tolerance
    }
}

// ============================================================================
// IN-MEMORY STORAGE
// ============================================================================

/// In-memory storage backend.
///
/// Keeps surveys and trees in `BTreeMap`s so list iteration is ordered by id
/// and stays consistent for an unchanged dataset. Identifiers come from
/// monotonic counters and are never reused after deletion.
pub struct MemoryStorage {
    surveys: RwLock<BTreeMap<SurveyId, Survey>>,
    trees: RwLock<BTreeMap<TreeId, Tree>>,
    next_survey_id: AtomicI64,
    next_tree_id: AtomicI64,
    clock: Arc<dyn Clock>,
    policy: ConflictPolicy,
}

impl MemoryStorage {
    pub fn new(clock: Arc<dyn Clock>, policy: ConflictPolicy) -> Self {
        Self {
            surveys: RwLock::new(BTreeMap::new()),
            trees: RwLock::new(BTreeMap::new()),
            next_survey_id: AtomicI64::new(1),
            next_tree_id: AtomicI64::new(1),
            clock,
            policy,
        }
    }

    /// Clear all stored data. Id counters are not reset; identifiers are
    /// never reused.
    pub fn clear(&self) {
        if let Ok(mut surveys) = self.surveys.write() {
            surveys.clear();
        }
        if let Ok(mut trees) = self.trees.write() {
            trees.clear();
        }
    }

    pub fn survey_count(&self) -> usize {
        self.surveys.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.read().map(|t| t.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SurveyStore for MemoryStorage {
    // === Survey Operations ===

    async fn survey_create(&self, new: NewSurvey) -> CanopyResult<Survey> {
        let mut surveys = self.surveys.write().map_err(|_| StorageError::LockPoisoned)?;
        let id = self.next_survey_id.fetch_add(1, Ordering::SeqCst);
        let survey = Survey {
            survey_id: id,
            farmer_name: new.farmer_name,
            crop_type: new.crop_type,
            geo_location: new.geo_location,
            sync_status: new.sync_status,
            last_updated: self.clock.now(),
        };
        surveys.insert(id, survey.clone());
        Ok(survey)
    }

    async fn survey_get(&self, id: SurveyId) -> CanopyResult<Option<Survey>> {
        let surveys = self.surveys.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(surveys.get(&id).cloned())
    }

    async fn survey_list(&self, offset: i64, limit: i64) -> CanopyResult<Vec<Survey>> {
        let surveys = self.surveys.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(surveys
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn survey_update(
        &self,
        id: SurveyId,
        update: SurveyUpdate,
        expected_last_updated: Option<Timestamp>,
    ) -> CanopyResult<Survey> {
        // The write lock spans the conflict check and the field writes, so
        // no other writer can slip between check and commit.
        let mut surveys = self.surveys.write().map_err(|_| StorageError::LockPoisoned)?;
        let survey = surveys.get_mut(&id).ok_or(StorageError::NotFound {
            entity_type: EntityType::Survey,
            id,
        })?;

        if let Some(provided) = expected_last_updated {
            if self.policy.is_stale(survey.last_updated, provided) {
                return Err(StorageError::UpdateConflict {
                    entity_type: EntityType::Survey,
                    id,
                    stored: survey.last_updated,
                    provided,
                }
                .into());
            }
        }

        if let Some(farmer_name) = update.farmer_name {
            survey.farmer_name = farmer_name;
        }
        if let Some(crop_type) = update.crop_type {
            survey.crop_type = crop_type;
        }
        if let Some(geo_location) = update.geo_location {
            survey.geo_location = geo_location;
        }
        if let Some(sync_status) = update.sync_status {
            survey.sync_status = sync_status;
        }
        survey.last_updated = self.clock.now();

        Ok(survey.clone())
    }

    async fn survey_delete(&self, id: SurveyId) -> CanopyResult<()> {
        // Lock ordering: surveys before trees, everywhere.
        let mut surveys = self.surveys.write().map_err(|_| StorageError::LockPoisoned)?;
        let mut trees = self.trees.write().map_err(|_| StorageError::LockPoisoned)?;

        if surveys.remove(&id).is_none() {
            return Err(StorageError::NotFound {
                entity_type: EntityType::Survey,
                id,
            }
            .into());
        }

        let before = trees.len();
        trees.retain(|_, tree| tree.survey_id != id);
        tracing::debug!(
            survey_id = id,
            cascaded_trees = before - trees.len(),
            "deleted survey"
        );
        Ok(())
    }

    // === Tree Operations ===

    async fn tree_create(&self, new: NewTree) -> CanopyResult<Tree> {
        let surveys = self.surveys.read().map_err(|_| StorageError::LockPoisoned)?;
        if !surveys.contains_key(&new.survey_id) {
            return Err(StorageError::ConstraintViolation {
                constraint: "trees.survey_id".to_string(),
                reason: format!("survey {} does not exist", new.survey_id),
            }
            .into());
        }

        let mut trees = self.trees.write().map_err(|_| StorageError::LockPoisoned)?;
        let id = self.next_tree_id.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now();
        let tree = Tree {
            tree_id: id,
            survey_id: new.survey_id,
            species_name: new.species_name,
            tree_count: new.tree_count,
            height_avg: new.height_avg,
            diameter_avg: new.diameter_avg,
            age_avg: new.age_avg,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        trees.insert(id, tree.clone());
        Ok(tree)
    }

    async fn tree_get(&self, id: TreeId) -> CanopyResult<Option<Tree>> {
        let trees = self.trees.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(trees.get(&id).cloned())
    }

    async fn tree_list_by_survey(&self, survey_id: SurveyId) -> CanopyResult<Vec<Tree>> {
        let trees = self.trees.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(trees
            .values()
            .filter(|tree| tree.survey_id == survey_id)
            .cloned()
            .collect())
    }

    async fn tree_update(&self, id: TreeId, update: TreeUpdate) -> CanopyResult<Tree> {
        let mut trees = self.trees.write().map_err(|_| StorageError::LockPoisoned)?;
        let tree = trees.get_mut(&id).ok_or(StorageError::NotFound {
            entity_type: EntityType::Tree,
            id,
        })?;

        if let Some(species_name) = update.species_name {
            tree.species_name = species_name;
        }
        if let Some(tree_count) = update.tree_count {
            tree.tree_count = tree_count;
        }
        if let Some(height_avg) = update.height_avg {
            tree.height_avg = Some(height_avg);
        }
        if let Some(diameter_avg) = update.diameter_avg {
            tree.diameter_avg = Some(diameter_avg);
        }
        if let Some(age_avg) = update.age_avg {
            tree.age_avg = Some(age_avg);
        }
        if let Some(notes) = update.notes {
            tree.notes = Some(notes);
        }
        tree.updated_at = self.clock.now();

        Ok(tree.clone())
    }

    async fn tree_delete(&self, id: TreeId) -> CanopyResult<()> {
        let mut trees = self.trees.write().map_err(|_| StorageError::LockPoisoned)?;
        if trees.remove(&id).is_none() {
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
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{CanopyError, ManualClock};
    use chrono::{Duration, TimeZone, Utc};

    fn epoch() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    fn test_store() -> (MemoryStorage, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MemoryStorage::new(clock.clone(), ConflictPolicy::default());
        (store, clock)
    }

    fn new_survey(farmer: &str) -> NewSurvey {
        NewSurvey {
            farmer_name: farmer.to_string(),
            crop_type: "Wheat".to_string(),
            geo_location: GeoLocation {
                latitude: 40.7128,
                longitude: -74.0060,
            },
            sync_status: false,
        }
    }

    fn new_tree(survey_id: SurveyId) -> NewTree {
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

    fn assert_conflict(result: CanopyResult<Survey>) {
        match result {
            Err(CanopyError::Storage(StorageError::UpdateConflict { .. })) => {}
            other => panic!("expected UpdateConflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_survey_create_assigns_ids_and_timestamp() {
        let (store, _clock) = test_store();

        let first = store.survey_create(new_survey("John Doe")).await.unwrap();
        let second = store.survey_create(new_survey("Jane Roe")).await.unwrap();

        assert_eq!(first.survey_id, 1);
        assert_eq!(second.survey_id, 2);
        assert_eq!(first.last_updated, epoch());
        assert_eq!(first.farmer_name, "John Doe");
        assert!(!first.sync_status);
    }

    #[tokio::test]
    async fn test_survey_ids_are_not_reused_after_delete() {
        let (store, _clock) = test_store();

        let survey = store.survey_create(new_survey("John Doe")).await.unwrap();
        store.survey_delete(survey.survey_id).await.unwrap();

        let next = store.survey_create(new_survey("Jane Roe")).await.unwrap();
        assert!(next.survey_id > survey.survey_id);
    }

    #[test]
    fn test_survey_update_is_empty() {
        assert!(SurveyUpdate::default().is_empty());
        assert!(!SurveyUpdate {
            sync_status: Some(false),
            ..Default::default()
        }
        .is_empty());
    }

    #[tokio::test]
    async fn test_survey_get_missing_returns_none() {
        let (store, _clock) = test_store();
        assert!(store.survey_get(99_999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_survey_list_pagination_windows() {
        let (store, _clock) = test_store();
        for i in 0..5 {
            store
                .survey_create(new_survey(&format!("Farmer {}", i)))
                .await
                .unwrap();
        }

        let first_page = store.survey_list(0, 2).await.unwrap();
        let second_page = store.survey_list(2, 2).await.unwrap();

        assert_eq!(first_page.len(), 2);
        assert_eq!(second_page.len(), 2);

        let first_ids: Vec<_> = first_page.iter().map(|s| s.survey_id).collect();
        let second_ids: Vec<_> = second_page.iter().map(|s| s.survey_id).collect();
        assert!(first_ids.iter().all(|id| !second_ids.contains(id)));

        // Consistent ordering for an unchanged dataset.
        assert_eq!(store.survey_list(0, 2).await.unwrap(), first_page);
        assert_eq!(store.survey_count(), 5);

        store.clear();
        assert_eq!(store.survey_count(), 0);
        assert!(store.survey_list(0, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_update_touches_only_supplied_fields() {
        let (store, clock) = test_store();
        let survey = store.survey_create(new_survey("John Doe")).await.unwrap();

        clock.advance(Duration::seconds(30));
        let updated = store
            .survey_update(
                survey.survey_id,
                SurveyUpdate {
                    farmer_name: Some("Jane Roe".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.farmer_name, "Jane Roe");
        assert_eq!(updated.crop_type, survey.crop_type);
        assert_eq!(updated.geo_location, survey.geo_location);
        assert_eq!(updated.sync_status, survey.sync_status);
        assert_eq!(updated.last_updated, epoch() + Duration::seconds(30));
    }

    #[tokio::test]
    async fn test_explicit_false_sync_status_is_a_real_overwrite() {
        let (store, _clock) = test_store();
        let mut new = new_survey("John Doe");
        new.sync_status = true;
        let survey = store.survey_create(new).await.unwrap();

        let updated = store
            .survey_update(
                survey.survey_id,
                SurveyUpdate {
                    sync_status: Some(false),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert!(!updated.sync_status);
    }

    #[tokio::test]
    async fn test_update_within_tolerance_succeeds() {
        let (store, clock) = test_store();
        let survey = store.survey_create(new_survey("John Doe")).await.unwrap();

        clock.advance(Duration::seconds(120));
        // Client timestamp off by exactly the tolerance still passes.
        let expected = survey.last_updated + Duration::seconds(1);
        let updated = store
            .survey_update(
                survey.survey_id,
                SurveyUpdate {
                    crop_type: Some("Corn".to_string()),
                    ..Default::default()
                },
                Some(expected),
            )
            .await
            .unwrap();

        assert_eq!(updated.crop_type, "Corn");
        assert!(updated.last_updated > survey.last_updated);
    }

    #[tokio::test]
    async fn test_update_outside_tolerance_conflicts_and_leaves_record_unchanged() {
        let (store, clock) = test_store();
        let survey = store.survey_create(new_survey("John Doe")).await.unwrap();

        // Another writer bumps the record.
        clock.advance(Duration::seconds(60));
        store
            .survey_update(survey.survey_id, SurveyUpdate::default(), None)
            .await
            .unwrap();

        // First client retries with its stale timestamp.
        let result = store
            .survey_update(
                survey.survey_id,
                SurveyUpdate {
                    farmer_name: Some("Imposter".to_string()),
                    ..Default::default()
                },
                Some(survey.last_updated),
            )
            .await;
        assert_conflict(result);

        let stored = store.survey_get(survey.survey_id).await.unwrap().unwrap();
        assert_eq!(stored.farmer_name, "John Doe");
        assert_eq!(stored.last_updated, epoch() + Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_update_without_expected_timestamp_skips_conflict_detection() {
        let (store, clock) = test_store();
        let survey = store.survey_create(new_survey("John Doe")).await.unwrap();

        clock.advance(Duration::hours(5));
        store
            .survey_update(survey.survey_id, SurveyUpdate::default(), None)
            .await
            .unwrap();

        // Unconditional overwrite, however stale the caller's view.
        let updated = store
            .survey_update(
                survey.survey_id,
                SurveyUpdate {
                    farmer_name: Some("Jane Roe".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.farmer_name, "Jane Roe");
    }

    #[tokio::test]
    async fn test_update_missing_survey_is_not_found() {
        let (store, _clock) = test_store();
        let result = store
            .survey_update(404, SurveyUpdate::default(), None)
            .await;
        assert!(matches!(
            result,
            Err(CanopyError::Storage(StorageError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_conflict_policy_tolerance_is_configurable() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MemoryStorage::new(clock.clone(), ConflictPolicy::with_tolerance_ms(5_000));
        let survey = store.survey_create(new_survey("John Doe")).await.unwrap();

        clock.advance(Duration::seconds(60));
        store
            .survey_update(survey.survey_id, SurveyUpdate::default(), None)
            .await
            .unwrap();

        // 4 seconds of drift fits a 5-second tolerance.
        let stored = store.survey_get(survey.survey_id).await.unwrap().unwrap();
        let drifted = stored.last_updated - Duration::seconds(4);
        assert!(store
            .survey_update(survey.survey_id, SurveyUpdate::default(), Some(drifted))
            .await
            .is_ok());

        let stored = store.survey_get(survey.survey_id).await.unwrap().unwrap();
        let too_far = stored.last_updated - Duration::seconds(6);
        assert_conflict(
            store
                .survey_update(survey.survey_id, SurveyUpdate::default(), Some(too_far))
                .await,
        );
    }

    #[tokio::test]
    async fn test_tree_create_requires_existing_survey() {
        let (store, _clock) = test_store();
        let result = store.tree_create(new_tree(404)).await;
        assert!(matches!(
            result,
            Err(CanopyError::Storage(StorageError::ConstraintViolation { .. }))
        ));
        assert_eq!(store.tree_count(), 0);
    }

    #[tokio::test]
    async fn test_tree_crud_round_trip() {
        let (store, clock) = test_store();
        let survey = store.survey_create(new_survey("John Doe")).await.unwrap();
        let tree = store.tree_create(new_tree(survey.survey_id)).await.unwrap();

        assert_eq!(tree.tree_id, 1);
        assert_eq!(tree.created_at, tree.updated_at);

        clock.advance(Duration::seconds(10));
        let updated = store
            .tree_update(
                tree.tree_id,
                TreeUpdate {
                    tree_count: Some(30),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tree_count, 30);
        assert_eq!(updated.species_name, tree.species_name);
        assert_eq!(updated.height_avg, tree.height_avg);
        assert_eq!(updated.created_at, tree.created_at);
        assert!(updated.updated_at > tree.updated_at);

        store.tree_delete(tree.tree_id).await.unwrap();
        assert!(store.tree_get(tree.tree_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_survey_delete_cascades_to_trees() {
        let (store, _clock) = test_store();
        let survey = store.survey_create(new_survey("John Doe")).await.unwrap();
        let other = store.survey_create(new_survey("Jane Roe")).await.unwrap();

        let doomed_a = store.tree_create(new_tree(survey.survey_id)).await.unwrap();
        let doomed_b = store.tree_create(new_tree(survey.survey_id)).await.unwrap();
        let kept = store.tree_create(new_tree(other.survey_id)).await.unwrap();

        store.survey_delete(survey.survey_id).await.unwrap();

        assert!(store.survey_get(survey.survey_id).await.unwrap().is_none());
        assert!(store.tree_get(doomed_a.tree_id).await.unwrap().is_none());
        assert!(store.tree_get(doomed_b.tree_id).await.unwrap().is_none());
        assert!(store.tree_get(kept.tree_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_survey_delete_missing_is_not_found() {
        let (store, _clock) = test_store();
        let result = store.survey_delete(404).await;
        assert!(matches!(
            result,
            Err(CanopyError::Storage(StorageError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_tree_list_by_survey_filters_and_orders() {
        let (store, _clock) = test_store();
        let survey = store.survey_create(new_survey("John Doe")).await.unwrap();
        let other = store.survey_create(new_survey("Jane Roe")).await.unwrap();

        let a = store.tree_create(new_tree(survey.survey_id)).await.unwrap();
        store.tree_create(new_tree(other.survey_id)).await.unwrap();
        let b = store.tree_create(new_tree(survey.survey_id)).await.unwrap();

        let listed = store.tree_list_by_survey(survey.survey_id).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|t| t.tree_id).collect();
        assert_eq!(ids, vec![a.tree_id, b.tree_id]);
    }
}
