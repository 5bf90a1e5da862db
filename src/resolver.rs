//! Nearest hub resolution
//!
//! Pure functions over a [`HubSnapshot`]: only active hubs are candidates,
//! distances are great-circle kilometers, and ties always go to the hub that
//! appears first in registry order.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::geo::{distance_km, km_to_miles};
use crate::models::{GeoPoint, Hub};
use crate::registry::HubSnapshot;

/// No active hub is available to match against
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No active hubs available for matching")]
pub struct NoCandidatesError;

/// A hub together with its distance from the query point
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HubMatch {
    pub hub: Hub,
    pub distance_km: f64,
}

impl HubMatch {
    #[must_use]
    pub fn distance_miles(&self) -> f64 {
        km_to_miles(self.distance_km)
    }
}

/// Nearest-hub search over a registry snapshot
pub struct NearestHubResolver;

impl NearestHubResolver {
    /// The closest active hub to `point`
    pub fn nearest(point: &GeoPoint, snapshot: &HubSnapshot) -> Result<HubMatch, NoCandidatesError> {
        let mut best: Option<(&Hub, f64)> = None;

        for hub in snapshot.active() {
            let distance = distance_km(point, &hub.location);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((hub, distance)),
            }
        }

        let (hub, distance_km) = best.ok_or(NoCandidatesError)?;
        debug!("Found nearest hub: {} at {:.2}km", hub.name, distance_km);
        Ok(HubMatch {
            hub: hub.clone(),
            distance_km,
        })
    }

    /// The `n` closest active hubs in ascending distance.
    ///
    /// Returns every active hub when fewer than `n` exist, and an empty list
    /// for `n == 0`.
    pub fn nearest_n(
        point: &GeoPoint,
        snapshot: &HubSnapshot,
        n: usize,
    ) -> Result<Vec<HubMatch>, NoCandidatesError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<(&Hub, f64)> = snapshot
            .active()
            .map(|hub| (hub, distance_km(point, &hub.location)))
            .collect();

        if candidates.is_empty() {
            return Err(NoCandidatesError);
        }

        // sort_by is stable, so equal distances keep registry order
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        candidates.truncate(n);

        debug!("Found {} nearest hubs", candidates.len());
        Ok(candidates
            .into_iter()
            .map(|(hub, distance_km)| HubMatch {
                hub: hub.clone(),
                distance_km,
            })
            .collect())
    }
}
