//! Error types and handling for the hub matching service

use axum::http::StatusCode;
use thiserror::Error;

use crate::geocoding::GeocodingError;
use crate::notification::NotificationError;
use crate::registry::RegistryError;
use crate::resolver::NoCandidatesError;

/// Main error type for the hub matching service
#[derive(Error, Debug)]
pub enum HubMatchError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Requested entity does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Hub source could not be loaded
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// No active hub is available for matching
    #[error(transparent)]
    NoCandidates(#[from] NoCandidatesError),

    /// Address could not be geocoded
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),

    /// Notification delivery failed
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl HubMatchError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            HubMatchError::Config { .. } => {
                "Service is misconfigured. Please contact the administrator.".to_string()
            }
            HubMatchError::Validation { message } => format!("Invalid input: {message}"),
            HubMatchError::NotFound { message } => message.clone(),
            HubMatchError::Registry(_) => {
                "Hub locations could not be loaded. Please try again later.".to_string()
            }
            HubMatchError::NoCandidates(_) => {
                "No delivery hubs are currently available for matching.".to_string()
            }
            HubMatchError::Geocoding(err) => format!("Geocoding error: {err}"),
            HubMatchError::Notification(_) => "Notification could not be delivered.".to_string(),
        }
    }

    /// HTTP status the API layer answers with
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            HubMatchError::Validation { .. } | HubMatchError::Geocoding(_) => {
                StatusCode::BAD_REQUEST
            }
            HubMatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            HubMatchError::NoCandidates(_) => StatusCode::SERVICE_UNAVAILABLE,
            HubMatchError::Config { .. }
            | HubMatchError::Registry(_)
            | HubMatchError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = HubMatchError::config("missing source path");
        assert!(matches!(config_err, HubMatchError::Config { .. }));

        let validation_err = HubMatchError::validation("invalid email");
        assert!(matches!(validation_err, HubMatchError::Validation { .. }));

        let not_found = HubMatchError::not_found("Location with ID x not found");
        assert!(matches!(not_found, HubMatchError::NotFound { .. }));
    }

    #[test]
    fn test_user_messages() {
        let config_err = HubMatchError::config("test");
        assert!(config_err.user_message().contains("misconfigured"));

        let validation_err = HubMatchError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));

        let no_candidates: HubMatchError = NoCandidatesError.into();
        assert!(no_candidates.user_message().contains("No delivery hubs"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            HubMatchError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HubMatchError::from(NoCandidatesError).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let registry = RegistryError::EmptySource {
            source_name: "csv:data/locations.csv".to_string(),
        };
        assert_eq!(
            HubMatchError::from(registry).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            HubMatchError::from(GeocodingError::EmptyAddress).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
