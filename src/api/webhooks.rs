//! Inbound form webhooks

use std::time::Instant;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{AppState, json_body};
use crate::Result;
use crate::intake;
use crate::models::{AddressInput, TypeformWebhook};

#[derive(Debug, Serialize)]
pub(super) struct WebhookResponse {
    status: &'static str,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
    matched_location: String,
    processing_time_ms: f64,
}

async fn process(
    state: &AppState,
    input: AddressInput,
    event_id: Option<String>,
    start_time: Instant,
) -> Result<Json<WebhookResponse>> {
    info!("Processing address: {}", input.address);
    let result = state.matcher.match_address(&input).await?;
    let matched_location = result.matched_location.name.clone();
    state.spawn_notification(result, input);

    let processing_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    info!("Webhook processed in {:.2}ms", processing_time_ms);
    Ok(Json(WebhookResponse {
        status: "success",
        message: "Webhook processed successfully",
        event_id,
        matched_location,
        processing_time_ms,
    }))
}

pub(super) async fn typeform(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TypeformWebhook>, JsonRejection>,
) -> Result<Json<WebhookResponse>> {
    let start_time = Instant::now();
    let webhook = json_body(payload)?;
    info!("Received Typeform webhook: {}", webhook.event_id);

    let input = intake::from_typeform(&webhook)?;
    process(&state, input, Some(webhook.event_id), start_time).await
}

pub(super) async fn generic(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookResponse>> {
    let start_time = Instant::now();
    info!("Received generic webhook");
    let input = intake::from_generic_payload(&json_body(payload)?)?;
    process(&state, input, None, start_time).await
}
