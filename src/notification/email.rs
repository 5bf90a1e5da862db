//! SMTP delivery of match emails

use std::time::Duration;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Serialize;
use tokio::task;
use tracing::{info, instrument};

use super::NotificationError;
use super::templates::{format_match_html, format_match_text, render_subject};
use crate::config::NotificationConfig;
use crate::models::{AddressInput, MatchResult};

/// Where a match email went
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailReceipt {
    pub recipient: String,
    pub cc: Option<String>,
}

/// Sends match emails through an SMTP relay
pub struct EmailNotifier {
    mailer: SmtpTransport,
    from: Mailbox,
    admin: Option<Mailbox>,
    subject_template: String,
}

fn parse_mailbox(address: &str, field: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse()
        .map_err(|e| NotificationError::InvalidAddress(format!("{field} '{address}': {e}")))
}

impl EmailNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let relay = config
            .smtp_relay
            .as_deref()
            .ok_or_else(|| NotificationError::NotConfigured("smtp_relay".to_string()))?;
        let from = config
            .email_from
            .as_deref()
            .ok_or_else(|| NotificationError::NotConfigured("email_from".to_string()))?;

        let mut builder = SmtpTransport::relay(relay)
            .map_err(|e| NotificationError::Email(e.to_string()))?
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from: parse_mailbox(from, "email_from")?,
            admin: config
                .email_admin
                .as_deref()
                .map(|admin| parse_mailbox(admin, "email_admin"))
                .transpose()?,
            subject_template: config.subject_template.clone(),
        })
    }

    /// Multipart text + HTML message to the applicant, admin in CC
    pub fn build_message(
        &self,
        result: &MatchResult,
        input: &AddressInput,
    ) -> Result<Message, NotificationError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&input.email, "recipient")?)
            .subject(render_subject(&self.subject_template, result));

        if let Some(admin) = &self.admin {
            builder = builder.cc(admin.clone());
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                format_match_text(result, input),
                format_match_html(result, input),
            ))
            .map_err(|e| NotificationError::Email(e.to_string()))
    }

    #[instrument(name = "send_email", skip(self, result, input), fields(recipient = %input.email))]
    pub async fn send(
        &self,
        result: &MatchResult,
        input: &AddressInput,
    ) -> Result<EmailReceipt, NotificationError> {
        let email = self.build_message(result, input)?;
        let mailer = self.mailer.clone();

        task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| NotificationError::Email(e.to_string()))?
            .map_err(|e| NotificationError::Email(e.to_string()))?;

        info!("Sent match email to {}", input.email);
        Ok(EmailReceipt {
            recipient: input.email.clone(),
            cc: self.admin.as_ref().map(|admin| admin.email.to_string()),
        })
    }
}
