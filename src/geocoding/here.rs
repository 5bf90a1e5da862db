//! HERE geocoding API client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use super::{GeocodedAddress, Geocoder, GeocodingError};
use crate::config::GeocodingConfig;
use crate::models::GeoPoint;
use crate::{HubMatchError, Result};

/// HERE geocode response, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    items: Vec<GeocodeItem>,
}

#[derive(Debug, Deserialize)]
struct GeocodeItem {
    title: Option<String>,
    position: Option<Position>,
}

#[derive(Debug, Deserialize)]
struct Position {
    lat: f64,
    lng: f64,
}

/// Geocoder backed by the HERE geocoding API
pub struct HereGeocoder {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

impl HereGeocoder {
    /// Build a client with retrying transport from the geocoding config
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| HubMatchError::config("geocoding.api_key is required"))?;

        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("hubmatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HubMatchError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        info!("Geocoding service initialized with HERE API");
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_url(&self, address: &str) -> String {
        format!(
            "{}/geocode?q={}&limit=1&apiKey={}",
            self.base_url,
            urlencoding::encode(address),
            urlencoding::encode(&self.api_key)
        )
    }
}

/// Pick the best item out of a HERE response body
fn parse_response(body: &str, address: &str) -> std::result::Result<GeocodedAddress, GeocodingError> {
    let response: GeocodeResponse = serde_json::from_str(body)
        .map_err(|e| GeocodingError::InvalidResponse(e.to_string()))?;

    let best = response
        .items
        .into_iter()
        .next()
        .ok_or_else(|| GeocodingError::NotFound(address.to_string()))?;

    let position = best
        .position
        .ok_or_else(|| GeocodingError::InvalidResponse("result has no position".to_string()))?;

    let point = GeoPoint::new(position.lat, position.lng)
        .map_err(|e| GeocodingError::InvalidResponse(e.to_string()))?;

    Ok(GeocodedAddress {
        point,
        formatted_address: best
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| address.to_string()),
    })
}

#[async_trait]
impl Geocoder for HereGeocoder {
    #[instrument(name = "geocode", skip(self))]
    async fn geocode(&self, address: &str) -> std::result::Result<GeocodedAddress, GeocodingError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeocodingError::EmptyAddress);
        }

        info!("Geocoding address: '{}'", address);
        let start_time = Instant::now();

        let response = self
            .client
            .get(self.request_url(address))
            .send()
            .await
            .map_err(|e| {
                error!("Request error during geocoding: {}", e);
                GeocodingError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("HTTP error during geocoding: {} - {}", status, error_text);
            return Err(GeocodingError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeocodingError::Request(e.to_string()))?;

        let result = parse_response(&body, address).inspect_err(|e| {
            warn!("Geocoding '{}' failed: {}", address, e);
        })?;

        debug!(
            "Geocoded '{}' to {} in {:.2}ms",
            address,
            result.point.format_coordinates(),
            start_time.elapsed().as_secs_f64() * 1000.0
        );
        Ok(result)
    }
}
