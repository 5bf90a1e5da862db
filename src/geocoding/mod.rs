//! Address geocoding
//!
//! [`Geocoder`] turns a free-form address into a [`GeoPoint`] plus the
//! provider's formatted address. [`HereGeocoder`] talks to the HERE
//! geocoding API and [`CachedGeocoder`] wraps any geocoder with a TTL cache.

pub mod cache;
pub mod here;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::GeoPoint;

pub use cache::{CachedGeocoder, GeocodeCache};
pub use here::HereGeocoder;

/// Geocoding failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodingError {
    #[error("Address cannot be empty")]
    EmptyAddress,

    #[error("No geocoding results found for address: {0}")]
    NotFound(String),

    #[error("Geocoding API error: HTTP {status}")]
    Http { status: u16 },

    #[error("Geocoding request failed: {0}")]
    Request(String),

    #[error("Invalid geocoding response: {0}")]
    InvalidResponse(String),
}

/// A geocoded address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedAddress {
    pub point: GeoPoint,
    pub formatted_address: String,
}

/// Resolves addresses to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodingError>;
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodingError> {
        (**self).geocode(address).await
    }
}
