//! Address to nearest hub matching

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::config::MatchingConfig;
use crate::geocoding::Geocoder;
use crate::models::{AddressInput, AlternativeHub, MatchResult};
use crate::registry::HubRegistry;
use crate::resolver::{NearestHubResolver, NoCandidatesError};
use crate::{HubMatchError, Result};

/// Geocodes submissions and resolves them against the current hub snapshot
pub struct MatchService {
    registry: Arc<HubRegistry>,
    geocoder: Arc<dyn Geocoder>,
    alternatives: usize,
    max_batch_size: usize,
}

impl MatchService {
    pub fn new(registry: Arc<HubRegistry>, geocoder: Arc<dyn Geocoder>, config: &MatchingConfig) -> Self {
        Self {
            registry,
            geocoder,
            alternatives: config.alternatives,
            max_batch_size: config.max_batch_size,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<HubRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Match one address to its nearest active hub.
    ///
    /// The whole match, including alternatives, is answered from a single
    /// registry snapshot even if a reload completes meanwhile.
    #[instrument(name = "match_address", skip_all, fields(address = %input.address))]
    pub async fn match_address(&self, input: &AddressInput) -> Result<MatchResult> {
        input.validate()?;
        let start_time = Instant::now();

        let geocoded = self.geocoder.geocode(&input.address).await?;
        info!(
            "Address geocoded to: {}",
            geocoded.point.format_coordinates()
        );

        let snapshot = self.registry.snapshot();
        let mut matches =
            NearestHubResolver::nearest_n(&geocoded.point, &snapshot, self.alternatives + 1)?
                .into_iter();
        let best = matches.next().ok_or(NoCandidatesError)?;
        info!(
            "Nearest location: {} at {:.2}km",
            best.hub.name, best.distance_km
        );

        let mut result = MatchResult::new(
            input.address.clone(),
            geocoded.formatted_address,
            geocoded.point,
            best.hub,
            best.distance_km,
        );

        if self.alternatives > 0 {
            result.alternative_locations = Some(
                matches
                    .map(|m| AlternativeHub {
                        distance_miles: m.distance_miles(),
                        id: m.hub.id,
                        name: m.hub.name,
                        distance_km: m.distance_km,
                    })
                    .collect(),
            );
        }

        result.processing_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        Ok(result)
    }

    /// Match several addresses in input order. Addresses that fail are
    /// logged and left out of the result.
    pub async fn match_batch(&self, inputs: &[AddressInput]) -> Result<Vec<MatchResult>> {
        Ok(self
            .match_each(inputs)
            .await?
            .into_iter()
            .map(|(_, result)| result)
            .collect())
    }

    /// Like [`MatchService::match_batch`], keeping each result paired with
    /// the submission it came from
    #[instrument(name = "match_batch", skip_all, fields(batch_size = inputs.len()))]
    pub async fn match_each<'a>(
        &self,
        inputs: &'a [AddressInput],
    ) -> Result<Vec<(&'a AddressInput, MatchResult)>> {
        if inputs.len() > self.max_batch_size {
            return Err(HubMatchError::validation(format!(
                "Batch size exceeds maximum of {}",
                self.max_batch_size
            )));
        }

        info!("Processing batch of {} addresses", inputs.len());
        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            match self.match_address(input).await {
                Ok(result) => results.push((input, result)),
                Err(e) => warn!("Error processing address '{}': {}", input.address, e),
            }
        }

        info!(
            "Batch matched {} of {} addresses",
            results.len(),
            inputs.len()
        );
        Ok(results)
    }
}
