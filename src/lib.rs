//! `hubmatch` - Match submitted addresses to the nearest delivery hub
//!
//! This library provides the hub registry with atomic reloads, nearest-hub
//! resolution by great-circle distance, geocoding, notifications and the
//! HTTP API built on top of them.

pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod geocoding;
pub mod intake;
pub mod logging;
pub mod match_service;
pub mod models;
pub mod notification;
pub mod registry;
pub mod resolver;
pub mod web;

// Re-export core types for public API
pub use config::HubMatchConfig;
pub use error::HubMatchError;
pub use geo::{EARTH_RADIUS_KM, KM_TO_MILES, distance_km, km_to_miles};
pub use geocoding::{CachedGeocoder, GeocodeCache, GeocodedAddress, Geocoder, GeocodingError, HereGeocoder};
pub use match_service::MatchService;
pub use models::{AddressInput, GeoPoint, Hub, HubCounts, MatchResult, RawHubRecord, RowError};
pub use notification::{NotificationError, NotificationMethod, NotificationService};
pub use registry::{CsvHubSource, HubRegistry, HubSnapshot, HubSource, JsonHubSource, RegistryError, StaticHubSource};
pub use resolver::{HubMatch, NearestHubResolver, NoCandidatesError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, HubMatchError>;
