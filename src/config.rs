//! Configuration management for the hub matching service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::HubMatchError;
use crate::notification::NotificationMethod;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the hub matching service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubMatchConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Where hub records come from
    #[serde(default)]
    pub source: SourceConfig,
    /// HERE geocoding API settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Email and webhook delivery
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Matching behavior
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// PEM certificate chain, enables TLS together with `tls_key_path`
    #[serde(default)]
    pub tls_cert_path: Option<PathBuf>,
    #[serde(default)]
    pub tls_key_path: Option<PathBuf>,
}

/// Format of the hub source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Csv,
    Json,
}

/// Hub source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
    /// Treat a source without records as a load failure
    #[serde(default = "default_true")]
    pub required: bool,
    /// Periodic reload interval, 0 disables it
    #[serde(default)]
    pub reload_interval_seconds: u64,
}

/// HERE geocoding API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// HERE API key
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_seconds: u64,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_geocoding_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// Email and webhook notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub method: NotificationMethod,
    /// Sender address for match emails
    #[serde(default)]
    pub email_from: Option<String>,
    /// Copied on every match email
    #[serde(default)]
    pub email_admin: Option<String>,
    /// Subject line, `{hub_name}` is replaced with the matched hub's name
    #[serde(default = "default_subject_template")]
    pub subject_template: String,
    #[serde(default)]
    pub smtp_relay: Option<String>,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Sent as `X-Webhook-Secret`
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_notification_timeout")]
    pub timeout_seconds: u64,
}

/// Matching behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Next-nearest hubs reported alongside the best match
    #[serde(default)]
    pub alternatives: usize,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_source_path() -> PathBuf {
    PathBuf::from("data/locations.csv")
}

fn default_geocoding_base_url() -> String {
    "https://geocode.search.hereapi.com/v1".to_string()
}

fn default_geocoding_timeout() -> u64 {
    10
}

fn default_geocoding_max_retries() -> u32 {
    3
}

fn default_cache_ttl() -> u64 {
    86_400
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_subject_template() -> String {
    "Your Nearest Delivery Hub: {hub_name}".to_string()
}

fn default_notification_timeout() -> u64 {
    10
}

fn default_max_batch_size() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            path: default_source_path(),
            required: true,
            reload_interval_seconds: 0,
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_geocoding_timeout(),
            max_retries: default_geocoding_max_retries(),
            cache_enabled: true,
            cache_ttl_seconds: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            method: NotificationMethod::default(),
            email_from: None,
            email_admin: None,
            subject_template: default_subject_template(),
            smtp_relay: None,
            smtp_username: None,
            smtp_password: None,
            webhook_url: None,
            webhook_secret: None,
            timeout_seconds: default_notification_timeout(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            alternatives: 0,
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl HubMatchConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // HUBMATCH_GEOCODING__API_KEY overrides geocoding.api_key
        builder = builder.add_source(
            Environment::with_prefix("HUBMATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: HubMatchConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hubmatch").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.source.path.as_os_str().is_empty() {
            self.source.path = default_source_path();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_geocoding_timeout();
        }
        if self.geocoding.cache_capacity == 0 {
            self.geocoding.cache_capacity = default_cache_capacity();
        }
        if self.notification.subject_template.is_empty() {
            self.notification.subject_template = default_subject_template();
        }
        if self.notification.timeout_seconds == 0 {
            self.notification.timeout_seconds = default_notification_timeout();
        }
        if self.matching.max_batch_size == 0 {
            self.matching.max_batch_size = default_max_batch_size();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_notification()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(HubMatchError::config("Server port cannot be 0").into());
        }

        if self.geocoding.timeout_seconds > 300 {
            return Err(
                HubMatchError::config("Geocoding timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.geocoding.max_retries > 10 {
            return Err(HubMatchError::config("Geocoding max retries cannot exceed 10").into());
        }

        if self.geocoding.cache_ttl_seconds > 7 * 86_400 {
            return Err(
                HubMatchError::config("Geocoding cache TTL cannot exceed 604800 seconds (1 week)")
                    .into(),
            );
        }

        if self.matching.alternatives > 20 {
            return Err(HubMatchError::config("Matching alternatives cannot exceed 20").into());
        }

        if self.matching.max_batch_size > 1000 {
            return Err(HubMatchError::config("Maximum batch size cannot exceed 1000").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(HubMatchError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(HubMatchError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.geocoding.base_url.starts_with("http://")
            && !self.geocoding.base_url.starts_with("https://")
        {
            return Err(HubMatchError::config(
                "Geocoding base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if let Some(api_key) = &self.geocoding.api_key
            && api_key.trim().is_empty()
        {
            return Err(HubMatchError::config(
                "Geocoding API key cannot be empty if provided. Either remove it or provide a valid key.",
            )
            .into());
        }

        Ok(())
    }

    /// Check that the selected notification method has what it needs
    fn validate_notification(&self) -> Result<()> {
        let notification = &self.notification;

        if notification.method.sends_email() {
            if notification.email_from.is_none() {
                return Err(HubMatchError::config(
                    "notification.email_from is required for email notifications",
                )
                .into());
            }
            if notification.smtp_relay.is_none() {
                return Err(HubMatchError::config(
                    "notification.smtp_relay is required for email notifications",
                )
                .into());
            }
        }

        if notification.method.sends_webhook() {
            match &notification.webhook_url {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                Some(_) => {
                    return Err(HubMatchError::config(
                        "notification.webhook_url must be a valid HTTP or HTTPS URL",
                    )
                    .into());
                }
                None => {
                    return Err(HubMatchError::config(
                        "notification.webhook_url is required for webhook notifications",
                    )
                    .into());
                }
            }
        }

        Ok(())
    }
}
