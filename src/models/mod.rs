//! Data models for the hub matching service
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic points
//! - Hub: Delivery hubs and the raw records they are loaded from
//! - Matching: Address submissions and match results

pub mod hub;
pub mod location;
pub mod matching;

// Re-export all public types for convenient access
pub use hub::{Hub, HubCounts, RawHubRecord, RowError};
pub use location::{CoordinateError, GeoPoint};
pub use matching::{AddressInput, AlternativeHub, MatchResult, TypeformWebhook};
