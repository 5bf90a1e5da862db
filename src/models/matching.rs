//! Address submissions and match results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::hub::Hub;
use super::location::GeoPoint;
use crate::geo::KM_TO_MILES;

/// An address submitted for matching, with contact details for the reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressInput {
    pub address: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AddressInput {
    #[must_use]
    pub fn new(address: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            email: email.into(),
            name: None,
            phone: None,
            application_id: None,
            metadata: Map::new(),
        }
    }

    /// Check the submission before any external call is made
    pub fn validate(&self) -> crate::Result<()> {
        if self.address.trim().is_empty() {
            return Err(crate::HubMatchError::validation("Address cannot be empty"));
        }

        if self.email.parse::<lettre::Address>().is_err() {
            return Err(crate::HubMatchError::validation(format!(
                "Invalid email address: {}",
                self.email
            )));
        }

        if let Some(phone) = &self.phone {
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            if !(7..=15).contains(&digits) {
                return Err(crate::HubMatchError::validation(
                    "Phone number must have between 7 and 15 digits",
                ));
            }
        }

        Ok(())
    }

    /// Name to greet the submitter with
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

/// A runner-up hub reported alongside the best match
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternativeHub {
    pub id: String,
    pub name: String,
    pub distance_km: f64,
    pub distance_miles: f64,
}

/// Result of matching one address to its nearest hub
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub input_address: String,
    pub geocoded_address: String,
    pub geocoded_coordinates: GeoPoint,
    pub matched_location: Hub,
    pub distance_km: f64,
    pub distance_miles: f64,
    pub processing_time_ms: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_locations: Option<Vec<AlternativeHub>>,
}

impl MatchResult {
    #[must_use]
    pub fn new(
        input_address: String,
        geocoded_address: String,
        geocoded_coordinates: GeoPoint,
        matched_location: Hub,
        distance_km: f64,
    ) -> Self {
        Self {
            input_address,
            geocoded_address,
            geocoded_coordinates,
            matched_location,
            distance_km,
            distance_miles: distance_km * KM_TO_MILES,
            processing_time_ms: 0.0,
            timestamp: Utc::now(),
            alternative_locations: None,
        }
    }
}

/// Typeform webhook payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TypeformWebhook {
    pub event_id: String,
    pub event_type: String,
    pub form_response: Map<String, Value>,
}
