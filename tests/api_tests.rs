//! HTTP API tests against the full router with a stub geocoder

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use hubmatch::api::AppState;
use hubmatch::config::{MatchingConfig, NotificationConfig, ServerConfig};
use hubmatch::{
    GeoPoint, GeocodedAddress, Geocoder, GeocodingError, HubRegistry, MatchService,
    NotificationMethod, NotificationService, RawHubRecord, StaticHubSource, web,
};

/// Knows a handful of addresses by name
struct StubGeocoder;

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodingError> {
        let (lat, lon) = match address.trim() {
            "" => return Err(GeocodingError::EmptyAddress),
            "near b" => (0.0, 0.75),
            "near a" => (0.0, 0.25),
            "far east" => (0.0, 9.0),
            other => return Err(GeocodingError::NotFound(other.to_string())),
        };
        Ok(GeocodedAddress {
            point: GeoPoint::new(lat, lon).unwrap(),
            formatted_address: format!("{address}, Formatted"),
        })
    }
}

fn raw(id: &str, lon: &str, region: &str, active: &str) -> RawHubRecord {
    RawHubRecord {
        id: Some(id.to_string()),
        name: Some(format!("Hub {id}")),
        address: Some(format!("{id} Main St")),
        latitude: Some("0".to_string()),
        longitude: Some(lon.to_string()),
        region: Some(region.to_string()),
        active: Some(active.to_string()),
        ..RawHubRecord::default()
    }
}

struct TestApp {
    router: axum::Router,
    source: Arc<StaticHubSource>,
}

async fn test_app(records: Vec<RawHubRecord>) -> TestApp {
    test_app_with_notifier(records, NotificationService::disabled()).await
}

async fn test_app_with_notifier(records: Vec<RawHubRecord>, notifier: NotificationService) -> TestApp {
    let source = Arc::new(StaticHubSource::new(records));
    let registry = Arc::new(HubRegistry::new(Box::new(Arc::clone(&source))));
    registry.load().await.unwrap();

    let matcher = Arc::new(MatchService::new(
        registry,
        Arc::new(StubGeocoder),
        &MatchingConfig {
            alternatives: 1,
            max_batch_size: 2,
        },
    ));
    let state = AppState::new(matcher, Arc::new(notifier));
    TestApp {
        router: web::app(state, &ServerConfig::default()),
        source,
    }
}

fn default_records() -> Vec<RawHubRecord> {
    vec![
        raw("A", "0", "West", "true"),
        raw("B", "1", "West", "true"),
        raw("C", "10", "East", "true"),
        raw("D", "0.7", "East", "false"),
    ]
}

async fn send(router: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_and_root() {
    let app = test_app(default_records()).await;

    let (status, body) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["locations_loaded"], 4);

    let (status, body) = send(&app.router, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_match_returns_nearest_active_hub() {
    let app = test_app(default_records()).await;
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/match",
        Some(json!({"address": "near b", "email": "jane@example.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // D at lon 0.7 is closer but inactive
    assert_eq!(body["matched_location"]["id"], "B");
    assert_eq!(body["geocoded_address"], "near b, Formatted");
    assert_eq!(body["alternative_locations"][0]["id"], "A");
    assert!(body["distance_miles"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_match_errors() {
    let app = test_app(default_records()).await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/match",
        Some(json!({"address": "atlantis", "email": "jane@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().contains("Geocoding error"));

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/match",
        Some(json!({"address": "near b", "email": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/match",
        Some(json!({"email": "jane@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_match_without_active_hubs_is_unavailable() {
    let app = test_app(vec![raw("D", "0.7", "East", "false")]).await;
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/match",
        Some(json!({"address": "near b", "email": "jane@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 503);
}

#[tokio::test]
async fn test_batch_match() {
    let app = test_app(default_records()).await;
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/match/batch",
        Some(json!([
            {"address": "far east", "email": "a@example.com"},
            {"address": "atlantis", "email": "b@example.com"}
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["matched_location"]["id"], "C");

    let too_many = json!([
        {"address": "near a", "email": "a@example.com"},
        {"address": "near a", "email": "b@example.com"},
        {"address": "near a", "email": "c@example.com"}
    ]);
    let (status, body) = send(&app.router, "POST", "/api/v1/match/batch", Some(too_many)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Batch size exceeds maximum of 2"));
}

#[tokio::test]
async fn test_locations_listing_and_lookup() {
    let app = test_app(default_records()).await;

    let (_, body) = send(&app.router, "GET", "/api/v1/locations", None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = send(&app.router, "GET", "/api/v1/locations?active_only=false", None).await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (_, body) = send(
        &app.router,
        "GET",
        "/api/v1/locations?active_only=false&region=East",
        None,
    )
    .await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|hub| hub["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["C", "D"]);

    let (status, body) = send(&app.router, "GET", "/api/v1/locations/C", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Hub C");
    assert_eq!(body["location"]["longitude"], 10.0);

    let (status, body) = send(&app.router, "GET", "/api/v1/locations/zzz", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Location with ID zzz not found");
}

#[tokio::test]
async fn test_stats_and_reload() {
    let app = test_app(default_records()).await;

    let (status, body) = send(&app.router, "GET", "/api/v1/locations/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    assert_eq!(body["active"], 3);
    assert_eq!(body["inactive"], 1);
    assert_eq!(body["rejected_rows"], 0);
    assert_eq!(body["source"], "static");

    app.source.replace(vec![
        raw("E", "5", "East", "true"),
        raw("F", "bad", "East", "true"),
    ]);
    let (status, body) = send(&app.router, "POST", "/api/v1/locations/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["rejected_rows"], 1);

    app.source.replace(vec![]);
    let (status, body) = send(&app.router, "POST", "/api/v1/locations/reload", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);

    // Failed reload keeps serving the previous hubs
    let (_, body) = send(&app.router, "GET", "/api/v1/locations/stats", None).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_generic_webhook() {
    let app = test_app(default_records()).await;
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/webhooks/generic",
        Some(json!({"address": "near a", "email": "jane@example.com", "name": "Jane"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["matched_location"], "Hub A");
    assert!(body.get("event_id").is_none());

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/webhooks/generic",
        Some(json!({"address": "near a"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Missing required field: email"));
}

#[tokio::test]
async fn test_typeform_webhook() {
    let app = test_app(default_records()).await;
    let payload = json!({
        "event_id": "evt-42",
        "event_type": "form_response",
        "form_response": {
            "form_id": "form-1",
            "token": "tok-1",
            "answers": [
                {"field": {"id": "address_field", "type": "text"}, "text": "far east"},
                {"field": {"id": "email_field", "type": "email"}, "email": "jane@example.com"}
            ]
        }
    });
    let (status, body) = send(&app.router, "POST", "/api/v1/webhooks/typeform", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event_id"], "evt-42");
    assert_eq!(body["matched_location"], "Hub C");
}

/// Local webhook endpoint counting the notifications it receives
async fn spawn_hook_counter() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let app = axum::Router::new().route(
        "/hook",
        axum::routing::post(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::OK
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/hook"), hits)
}

async fn wait_for_hits(hits: &AtomicUsize, expected: usize) {
    for _ in 0..100 {
        if hits.load(Ordering::SeqCst) >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_match_notifies_unless_disabled_by_query() {
    let (url, hits) = spawn_hook_counter().await;
    let notifier = NotificationService::new(&NotificationConfig {
        method: NotificationMethod::Webhook,
        webhook_url: Some(url),
        ..NotificationConfig::default()
    })
    .unwrap();
    let app = test_app_with_notifier(default_records(), notifier).await;
    let input = json!({"address": "near b", "email": "driver@example.com"});

    let (status, _) = send(&app.router, "POST", "/api/v1/match", Some(input.clone())).await;
    assert_eq!(status, StatusCode::OK);
    wait_for_hits(&hits, 1).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/match?send_notification=false",
        Some(input.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, "POST", "/api/v1/match/batch", Some(json!([input]))).await;
    assert_eq!(status, StatusCode::OK);
    wait_for_hits(&hits, 2).await;

    // Give a stray notification from the opted-out request time to land
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
