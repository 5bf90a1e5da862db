//! HTTP API
//!
//! Everything lives under `/api/v1` apart from the `/health` and `/` probes.

mod webhooks;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::match_service::MatchService;
use crate::models::{AddressInput, Hub, HubCounts, MatchResult};
use crate::notification::NotificationService;
use crate::registry::{HubRegistry, HubSnapshot};
use crate::{HubMatchError, Result};

const SERVICE_NAME: &str = "Driver-Hub Matching Service";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<MatchService>,
    pub notifier: Arc<NotificationService>,
}

impl AppState {
    pub fn new(matcher: Arc<MatchService>, notifier: Arc<NotificationService>) -> Self {
        Self { matcher, notifier }
    }

    fn registry(&self) -> &Arc<HubRegistry> {
        self.matcher.registry()
    }

    /// Deliver a match notification in the background. Failures are only logged.
    fn spawn_notification(&self, result: MatchResult, input: AddressInput) {
        if !self.notifier.is_enabled() {
            return;
        }
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            match notifier.send(&result, &input).await {
                Ok(_) => info!("Notification sent successfully to {}", input.email),
                Err(e) => error!("Failed to send notification to {}: {}", input.email, e),
            }
        });
    }
}

impl IntoResponse for HubMatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        let body = json!({
            "error": self.user_message(),
            "code": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

/// Turn a body extraction failure into our own error shape
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| HubMatchError::validation(rejection.body_text()))
}

pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/match", post(match_address))
        .route("/match/batch", post(match_batch))
        .route("/locations", get(list_locations))
        .route("/locations/stats", get(location_stats))
        .route("/locations/reload", post(reload_locations))
        .route("/locations/{id}", get(get_location))
        .route("/webhooks/typeform", post(webhooks::typeform))
        .route("/webhooks/generic", post(webhooks::generic));

    Router::new()
        .route("/health", get(health))
        .route("/", get(root))
        .nest("/api/v1", v1)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct NotifyParams {
    #[serde(default = "default_true")]
    send_notification: bool,
}

async fn match_address(
    State(state): State<AppState>,
    Query(params): Query<NotifyParams>,
    payload: std::result::Result<Json<AddressInput>, JsonRejection>,
) -> Result<Json<MatchResult>> {
    let input = json_body(payload)?;
    let result = state.matcher.match_address(&input).await?;

    if params.send_notification {
        state.spawn_notification(result.clone(), input);
    }
    Ok(Json(result))
}

async fn match_batch(
    State(state): State<AppState>,
    Query(params): Query<NotifyParams>,
    payload: std::result::Result<Json<Vec<AddressInput>>, JsonRejection>,
) -> Result<Json<Vec<MatchResult>>> {
    let inputs = json_body(payload)?;
    let matched = state.matcher.match_each(&inputs).await?;

    let results = matched
        .into_iter()
        .map(|(input, result)| {
            if params.send_notification {
                state.spawn_notification(result.clone(), input.clone());
            }
            result
        })
        .collect();
    Ok(Json(results))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct LocationParams {
    #[serde(default = "default_true")]
    active_only: bool,
    region: Option<String>,
}

async fn list_locations(
    State(state): State<AppState>,
    Query(params): Query<LocationParams>,
) -> Json<Vec<Hub>> {
    let snapshot = state.registry().snapshot();
    let hubs = snapshot
        .hubs()
        .iter()
        .filter(|hub| !params.active_only || hub.active)
        .filter(|hub| match &params.region {
            Some(region) => hub.region.as_ref() == Some(region),
            None => true,
        })
        .cloned()
        .collect();
    Json(hubs)
}

async fn get_location(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Hub>> {
    state
        .registry()
        .get_by_id(&id)
        .map(Json)
        .ok_or_else(|| HubMatchError::not_found(format!("Location with ID {id} not found")))
}

#[derive(Debug, Serialize)]
struct LocationStats {
    #[serde(flatten)]
    counts: HubCounts,
    last_loaded: Option<DateTime<Utc>>,
    rejected_rows: usize,
    source: String,
}

impl From<&HubSnapshot> for LocationStats {
    fn from(snapshot: &HubSnapshot) -> Self {
        Self {
            counts: snapshot.counts(),
            last_loaded: snapshot.loaded_at(),
            rejected_rows: snapshot.rejected_rows(),
            source: snapshot.source().to_string(),
        }
    }
}

async fn location_stats(State(state): State<AppState>) -> Json<LocationStats> {
    Json(LocationStats::from(state.registry().snapshot().as_ref()))
}

async fn reload_locations(State(state): State<AppState>) -> Result<Json<LocationStats>> {
    let snapshot = state.registry().reload().await?;
    Ok(Json(LocationStats::from(snapshot.as_ref())))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.registry().snapshot();
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "locations_loaded": snapshot.hubs().len(),
        "last_loaded": snapshot.loaded_at(),
    }))
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": crate::VERSION,
    }))
}
