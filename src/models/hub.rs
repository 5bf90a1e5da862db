//! Delivery hub model and raw source records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::location::GeoPoint;

/// A delivery hub eligible to be matched against incoming addresses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hub {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub location: GeoPoint,
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// One record as delivered by a hub source, before validation.
///
/// Every field is optional text so the CSV and JSON sources can hand over
/// rows without interpreting them; [`Hub::try_from_raw`] is the only place
/// where a record becomes a hub.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawHubRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub active: Option<String>,
}

/// Why a single source row was dropped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid {field} '{value}'")]
    InvalidCoordinate { field: &'static str, value: String },

    #[error("invalid active flag '{0}'")]
    InvalidFlag(String),

    #[error("undecodable record: {0}")]
    Undecodable(String),
}

/// Hub count statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubCounts {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

impl RawHubRecord {
    /// Build a record from a JSON object, accepting numbers and booleans
    /// where text is expected.
    #[must_use]
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let field = |key: &str| object.get(key).and_then(json_to_text);
        Self {
            id: field("id"),
            name: field("name"),
            address: field("address"),
            city: field("city"),
            state: field("state"),
            postal_code: field("postal_code"),
            country: field("country"),
            latitude: field("latitude"),
            longitude: field("longitude"),
            region: field("region"),
            kind: field("type"),
            active: field("active"),
        }
    }
}

fn json_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RowError> {
    clean(value).ok_or(RowError::MissingField(field))
}

fn parse_coordinate(value: Option<String>, field: &'static str) -> Result<f64, RowError> {
    let text = required(value, field)?;
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(RowError::InvalidCoordinate { field, value: text })
}

fn parse_active(value: Option<String>) -> Result<bool, RowError> {
    let Some(text) = clean(value) else {
        return Ok(true);
    };
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "t" => Ok(true),
        "false" | "no" | "n" | "0" | "f" => Ok(false),
        _ => Err(RowError::InvalidFlag(text)),
    }
}

impl Hub {
    /// Validate and convert a raw record. `row` is the 1-based position in
    /// the source and names the hub when the record carries no id.
    pub fn try_from_raw(raw: RawHubRecord, row: usize) -> Result<Self, RowError> {
        let name = required(raw.name, "name")?;
        let address = required(raw.address, "address")?;
        let latitude = parse_coordinate(raw.latitude, "latitude")?;
        let longitude = parse_coordinate(raw.longitude, "longitude")?;

        let location = GeoPoint::new(latitude, longitude).map_err(|e| {
            let (field, value) = match e {
                super::location::CoordinateError::Latitude(v) => ("latitude", v),
                super::location::CoordinateError::Longitude(v) => ("longitude", v),
            };
            RowError::InvalidCoordinate {
                field,
                value: value.to_string(),
            }
        })?;

        let active = parse_active(raw.active)?;

        Ok(Self {
            id: clean(raw.id).unwrap_or_else(|| format!("hub-{row}")),
            name,
            address,
            city: clean(raw.city),
            state: clean(raw.state),
            postal_code: clean(raw.postal_code),
            country: clean(raw.country),
            location,
            region: clean(raw.region),
            kind: clean(raw.kind),
            active,
        })
    }
}
