//! Webhook delivery of match results

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use super::NotificationError;
use crate::config::NotificationConfig;
use crate::models::{AddressInput, MatchResult};

/// Outcome of a webhook POST
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookReceipt {
    pub url: String,
    pub status: u16,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    match_result: &'a MatchResult,
    address_input: &'a AddressInput,
    timestamp: String,
}

/// Posts match results as JSON to a configured URL
pub struct WebhookNotifier {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let url = config
            .webhook_url
            .clone()
            .ok_or_else(|| NotificationError::NotConfigured("webhook_url".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| NotificationError::WebhookRequest(e.to_string()))?;

        Ok(Self {
            client,
            url,
            secret: config.webhook_secret.clone(),
        })
    }

    #[instrument(name = "send_webhook", skip_all, fields(url = %self.url))]
    pub async fn send(
        &self,
        result: &MatchResult,
        input: &AddressInput,
    ) -> Result<WebhookReceipt, NotificationError> {
        let payload = WebhookPayload {
            match_result: result,
            address_input: input,
            timestamp: Utc::now().to_rfc3339(),
        };

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(secret) = &self.secret {
            request = request.header("X-Webhook-Secret", secret);
        }

        let response = request.send().await.map_err(|e| {
            error!("Webhook request error: {}", e);
            NotificationError::WebhookRequest(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Webhook HTTP error: {} - {}", status, error_text);
            return Err(NotificationError::WebhookStatus {
                status: status.as_u16(),
            });
        }

        info!("Webhook notification sent with status code: {}", status);
        Ok(WebhookReceipt {
            url: self.url.clone(),
            status: status.as_u16(),
        })
    }
}
