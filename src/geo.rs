//! Great-circle distance on a spherical earth

use crate::models::GeoPoint;

/// Mean earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Fixed kilometers to miles conversion
pub const KM_TO_MILES: f64 = 0.621371;

/// Haversine distance between two points in kilometers
#[inline]
#[must_use]
pub fn distance_km(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let delta_lat = (to.latitude() - from.latitude()).to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[inline]
#[must_use]
pub fn km_to_miles(km: f64) -> f64 {
    km * KM_TO_MILES
}
