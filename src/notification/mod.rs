//! Match notifications by email and webhook

pub mod email;
pub mod templates;
pub mod webhook;

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::NotificationConfig;
use crate::models::{AddressInput, MatchResult};
pub use email::{EmailNotifier, EmailReceipt};
pub use templates::{format_match_html, format_match_text, render_subject};
pub use webhook::{WebhookNotifier, WebhookReceipt};

/// Notification failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    #[error("Notification setting missing: {0}")]
    NotConfigured(String),

    #[error("Invalid email address {0}")]
    InvalidAddress(String),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("Webhook request failed: {0}")]
    WebhookRequest(String),

    #[error("Webhook HTTP error: {status}")]
    WebhookStatus { status: u16 },
}

/// Which channels a match is announced on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMethod {
    Email,
    Webhook,
    Both,
    #[default]
    None,
}

impl NotificationMethod {
    #[must_use]
    pub fn sends_email(self) -> bool {
        matches!(self, Self::Email | Self::Both)
    }

    #[must_use]
    pub fn sends_webhook(self) -> bool {
        matches!(self, Self::Webhook | Self::Both)
    }
}

/// What a [`NotificationService::send`] delivered
#[derive(Debug, Clone, Serialize)]
pub struct NotificationReport {
    pub method: NotificationMethod,
    pub email: Option<EmailReceipt>,
    pub webhook: Option<WebhookReceipt>,
    pub timestamp: DateTime<Utc>,
}

/// Dispatches match results to the configured channels
pub struct NotificationService {
    method: NotificationMethod,
    email: Option<EmailNotifier>,
    webhook: Option<WebhookNotifier>,
}

impl NotificationService {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let email = config
            .method
            .sends_email()
            .then(|| EmailNotifier::new(config))
            .transpose()?;
        let webhook = config
            .method
            .sends_webhook()
            .then(|| WebhookNotifier::new(config))
            .transpose()?;

        info!(
            "Notification service initialized with method: {:?}",
            config.method
        );
        Ok(Self {
            method: config.method,
            email,
            webhook,
        })
    }

    /// A service that sends nothing
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            method: NotificationMethod::None,
            email: None,
            webhook: None,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.method != NotificationMethod::None
    }

    /// Announce a match on every configured channel. With `Both`, a failed
    /// email stops the webhook from being sent.
    #[instrument(name = "notify", skip_all, fields(recipient = %input.email))]
    pub async fn send(
        &self,
        result: &MatchResult,
        input: &AddressInput,
    ) -> Result<NotificationReport, NotificationError> {
        let start_time = Instant::now();
        let mut report = NotificationReport {
            method: self.method,
            email: None,
            webhook: None,
            timestamp: Utc::now(),
        };

        if !self.is_enabled() {
            debug!("Notifications disabled, nothing sent");
            return Ok(report);
        }

        if let Some(email) = &self.email {
            report.email = Some(email.send(result, input).await?);
        }
        if let Some(webhook) = &self.webhook {
            report.webhook = Some(webhook.send(result, input).await?);
        }

        info!(
            "Notification sent in {:.2}ms",
            start_time.elapsed().as_secs_f64() * 1000.0
        );
        Ok(report)
    }
}
