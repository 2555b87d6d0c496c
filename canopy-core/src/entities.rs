//! Core entity structures

use crate::error::ValidationError;
use crate::{SurveyId, Timestamp, TreeId, LATITUDE_RANGE, LONGITUDE_RANGE};
use serde::{Deserialize, Serialize};

/// Entity discriminator used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EntityType {
    Survey,
    Tree,
}

/// Geographic location with latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GeoLocation {
    /// Latitude coordinate, -90 to 90 inclusive
    pub latitude: f64,
    /// Longitude coordinate, -180 to 180 inclusive
    pub longitude: f64,
}

impl GeoLocation {
    /// Validate that both coordinates are inside their declared ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let (lat_min, lat_max) = LATITUDE_RANGE;
        if !(lat_min..=lat_max).contains(&self.latitude) {
            return Err(ValidationError::OutOfRange {
                field: "latitude".to_string(),
                value: self.latitude,
                min: lat_min,
                max: lat_max,
            });
        }
        let (lon_min, lon_max) = LONGITUDE_RANGE;
        if !(lon_min..=lon_max).contains(&self.longitude) {
            return Err(ValidationError::OutOfRange {
                field: "longitude".to_string(),
                value: self.longitude,
                min: lon_min,
                max: lon_max,
            });
        }
        Ok(())
    }
}

/// Survey - one farmer/crop/location observation record.
/// The unit of conflict detection: updates are guarded by `last_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Survey {
    pub survey_id: SurveyId,
    pub farmer_name: String,
    pub crop_type: String,
    pub geo_location: GeoLocation,
    pub sync_status: bool,
    /// Set on creation and on every successful mutation.
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub last_updated: Timestamp,
}

/// Tree - a per-species measurement record owned by exactly one survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Tree {
    pub tree_id: TreeId,
    pub survey_id: SurveyId,
    pub species_name: String,
    pub tree_count: i32,
    /// Average height in meters
    pub height_avg: Option<f64>,
    /// Average diameter in centimeters
    pub diameter_avg: Option<f64>,
    /// Average age in years
    pub age_avg: Option<i32>,
    pub notes: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// Payload for creating a survey. The store assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSurvey {
    pub farmer_name: String,
    pub crop_type: String,
    pub geo_location: GeoLocation,
    pub sync_status: bool,
}

impl NewSurvey {
    /// Validate all field constraints. Must pass before the payload reaches
    /// a store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.farmer_name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "farmer_name".to_string(),
            });
        }
        if self.crop_type.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "crop_type".to_string(),
            });
        }
        self.geo_location.validate()
    }
}

/// Payload for creating a tree under an existing survey.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTree {
    pub survey_id: SurveyId,
    pub species_name: String,
    pub tree_count: i32,
    pub height_avg: Option<f64>,
    pub diameter_avg: Option<f64>,
    pub age_avg: Option<i32>,
    pub notes: Option<String>,
}

impl NewTree {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.species_name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "species_name".to_string(),
            });
        }
        if self.tree_count <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "tree_count".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(height) = self.height_avg {
            if height < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: "height_avg".to_string(),
                    reason: "must be non-negative".to_string(),
                });
            }
        }
        if let Some(diameter) = self.diameter_avg {
            if diameter < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: "diameter_avg".to_string(),
                    reason: "must be non-negative".to_string(),
                });
            }
        }
        if let Some(age) = self.age_avg {
            if age < 0 {
                return Err(ValidationError::InvalidValue {
                    field: "age_avg".to_string(),
                    reason: "must be non-negative".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo(latitude: f64, longitude: f64) -> GeoLocation {
        GeoLocation {
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_geo_location_accepts_boundaries() {
        assert!(geo(90.0, 180.0).validate().is_ok());
        assert!(geo(-90.0, -180.0).validate().is_ok());
        assert!(geo(0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_geo_location_rejects_out_of_range_latitude() {
        let err = geo(91.0, 0.0).validate().unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "latitude"));
    }

    #[test]
    fn test_geo_location_rejects_out_of_range_longitude() {
        let err = geo(0.0, 181.0).validate().unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "longitude"));
    }

    #[test]
    fn test_new_survey_rejects_blank_farmer_name() {
        let new = NewSurvey {
            farmer_name: "   ".to_string(),
            crop_type: "Wheat".to_string(),
            geo_location: geo(40.7, -74.0),
            sync_status: false,
        };
        let err = new.validate().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::RequiredFieldMissing { ref field } if field == "farmer_name"
        ));
    }

    #[test]
    fn test_new_tree_rejects_zero_count() {
        let new = NewTree {
            survey_id: 1,
            species_name: "Oak".to_string(),
            tree_count: 0,
            height_avg: None,
            diameter_avg: None,
            age_avg: None,
            notes: None,
        };
        let err = new.validate().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidValue { ref field, .. } if field == "tree_count"
        ));
    }

    #[test]
    fn test_new_tree_rejects_negative_measurements() {
        let base = NewTree {
            survey_id: 1,
            species_name: "Oak".to_string(),
            tree_count: 5,
            height_avg: None,
            diameter_avg: None,
            age_avg: None,
            notes: None,
        };

        let mut tree = base.clone();
        tree.height_avg = Some(-0.1);
        assert!(tree.validate().is_err());

        let mut tree = base.clone();
        tree.diameter_avg = Some(-1.0);
        assert!(tree.validate().is_err());

        let mut tree = base.clone();
        tree.age_avg = Some(-1);
        assert!(tree.validate().is_err());

        let mut tree = base;
        tree.height_avg = Some(0.0);
        tree.diameter_avg = Some(0.0);
        tree.age_avg = Some(0);
        assert!(tree.validate().is_ok());
    }
}
