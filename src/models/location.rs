//! Geographic point model

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coordinates outside the valid geographic range
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude must be between -90 and 90, got: {0}")]
    Latitude(f64),
    #[error("Longitude must be between -180 and 180, got: {0}")]
    Longitude(f64),
}

/// A point on the earth's surface in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = CoordinateError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl GeoPoint {
    /// Create a point, rejecting non-finite or out-of-range coordinates
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Format point as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_point() {
        let point = GeoPoint::new(39.7817, -89.6501).unwrap();
        assert_eq!(point.latitude(), 39.7817);
        assert_eq!(point.longitude(), -89.6501);
        assert_eq!(point.format_coordinates(), "39.7817, -89.6501");
    }

    #[rstest]
    #[case(90.0, 180.0)]
    #[case(-90.0, -180.0)]
    #[case(0.0, 0.0)]
    fn test_boundary_points_accepted(#[case] lat: f64, #[case] lon: f64) {
        assert!(GeoPoint::new(lat, lon).is_ok());
    }

    #[rstest]
    #[case(90.1, 0.0)]
    #[case(-91.0, 0.0)]
    #[case(0.0, 180.5)]
    #[case(0.0, -181.0)]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn test_invalid_points_rejected(#[case] lat: f64, #[case] lon: f64) {
        assert!(GeoPoint::new(lat, lon).is_err());
    }

    #[test]
    fn test_deserialize_validates_range() {
        let ok: GeoPoint = serde_json::from_str(r#"{"latitude": 41.8781, "longitude": -87.6298}"#)
            .unwrap();
        assert_eq!(ok.latitude(), 41.8781);

        let bad = serde_json::from_str::<GeoPoint>(r#"{"latitude": 120.0, "longitude": 0.0}"#);
        assert!(bad.is_err());
    }
}
