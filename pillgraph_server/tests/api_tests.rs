//! Integration tests for the Pillgraph REST API.
//!
//! Uses a temp-dir snapshot path and a mock vision client to test handler
//! logic via tower::ServiceExt (no TCP listener needed).

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use pillgraph_config::PillgraphConfig;
use pillgraph_core::GraphStore;
use pillgraph_server::error::AppError;
use pillgraph_server::router::build_router;
use pillgraph_server::state::AppState;
use pillgraph_server::vision::VisionClient;

/// A vision client that returns a canned response.
struct MockVision {
    output: String,
}

#[async_trait]
impl VisionClient for MockVision {
    async fn analyze_label(&self, _mime: &str, _data: &str) -> Result<String, AppError> {
        Ok(self.output.clone())
    }
}

/// Build an app over a fresh temp-dir snapshot. Keep the TempDir alive for
/// the duration of the test.
fn test_app(vision_output: Option<&str>) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PillgraphConfig::default();
    config.storage.snapshot_path = dir
        .path()
        .join("graph.json")
        .to_string_lossy()
        .to_string();

    let store = Arc::new(GraphStore::open(&config.storage.snapshot_path));
    let vision: Option<Arc<dyn VisionClient>> = vision_output.map(|out| {
        Arc::new(MockVision {
            output: out.to_string(),
        }) as Arc<dyn VisionClient>
    });
    let state = Arc::new(AppState::new(store, vision, config));
    (build_router(state).unwrap(), dir)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

const ADVIL_FRAGMENT: &str = r#"{
    "medications": {
        "m1": {
            "name": "Advil",
            "ingredients": ["Ibuprofen"],
            "sideEffects": ["Stomach upset"],
            "symptomsTreated": ["Headache"]
        }
    }
}"#;

#[tokio::test]
async fn health_reports_status_and_vision_readiness() {
    let (app, _dir) = test_app(None);
    let (status, json) = get(&app, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["vision_ready"], false);
    assert_eq!(json["vision_provider"], "gemini");
}

#[tokio::test]
async fn merge_then_lookup_round_trips() {
    let (app, _dir) = test_app(None);

    let (status, json) = post_json(&app, "/api/v1/data", ADVIL_FRAGMENT).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["medication_count"], 1);
    assert_eq!(json["ingredient_count"], 1);
    assert_eq!(json["effect_count"], 2);

    // Lookup is case-insensitive.
    let (status, json) = get(&app, "/api/v1/medications/ADVIL").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Advil");
    assert_eq!(json["ingredients"][0], "Ibuprofen");

    // Propagation created the reverse entries.
    let (status, json) = get(&app, "/api/v1/ingredients/ibuprofen").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["medications"][0], "Advil");

    let (status, json) = get(&app, "/api/v1/effects/Stomach%20upset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["medicationsCausingIt"][0], "Advil");

    let (_, json) = get(&app, "/api/v1/effects/headache").await;
    assert_eq!(json["medicationsTreatingIt"][0], "Advil");
}

#[tokio::test]
async fn lookup_missing_entity_is_a_structured_404() {
    let (app, _dir) = test_app(None);
    let (status, json) = get(&app, "/api/v1/medications/Advil").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["kind"], "medication");
    assert_eq!(json["name"], "Advil");
}

#[tokio::test]
async fn merge_rejects_non_object_body() {
    let (app, _dir) = test_app(None);
    let (status, _) = post_json(&app, "/api/v1/data", "[1, 2, 3]").await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn repeated_merges_are_idempotent() {
    let (app, _dir) = test_app(None);
    post_json(&app, "/api/v1/data", ADVIL_FRAGMENT).await;
    let (_, json) = post_json(&app, "/api/v1/data", ADVIL_FRAGMENT).await;
    assert_eq!(json["medication_count"], 1);
    assert_eq!(json["ingredient_count"], 1);
    assert_eq!(json["effect_count"], 2);

    let (_, json) = get(&app, "/api/v1/ingredients/Ibuprofen").await;
    assert_eq!(json["medications"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn search_finds_partial_word_and_rejects_empty_query() {
    let (app, _dir) = test_app(None);
    post_json(&app, "/api/v1/data", ADVIL_FRAGMENT).await;

    let (status, json) = get(&app, "/api/v1/search?q=head").await;
    assert_eq!(status, StatusCode::OK);
    let effects = json["effects"].as_array().unwrap();
    assert!(effects.iter().any(|e| e["name"] == "Headache"));

    let (status, json) = get(&app, "/api/v1/search?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");

    // Missing q entirely behaves like empty.
    let (status, _) = get(&app, "/api/v1/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn graph_endpoint_returns_the_full_snapshot() {
    let (app, _dir) = test_app(None);
    post_json(&app, "/api/v1/data", ADVIL_FRAGMENT).await;

    let (status, json) = get(&app, "/api/v1/graph").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["medications"].get("advil").is_some());
    assert!(json["ingredients"].get("ibuprofen").is_some());
    assert!(json["effects"].get("headache").is_some());
}

#[tokio::test]
async fn scan_merges_the_extracted_fragment() {
    let fenced = "```json\n{\"medications\":{\"m\":{\"name\":\"Tylenol\",\
                  \"ingredients\":[\"Acetaminophen\"]}}}\n```";
    let (app, _dir) = test_app(Some(fenced));

    let (status, json) = post_json(
        &app,
        "/api/v1/scan",
        r#"{"image": "data:image/png;base64,aGVsbG8="}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["medication_count"], 1);

    let (status, json) = get(&app, "/api/v1/medications/tylenol").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Tylenol");
}

#[tokio::test]
async fn scan_surfaces_not_a_medication() {
    let (app, _dir) = test_app(Some(r#"{"error": "not_a_medication"}"#));
    let (status, json) = post_json(
        &app,
        "/api/v1/scan",
        r#"{"image": "data:image/jpeg;base64,aGVsbG8="}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "NOT_A_MEDICATION");
}

#[tokio::test]
async fn scan_rejects_malformed_image_payloads() {
    let (app, _dir) = test_app(Some("{}"));

    let (status, _) = post_json(&app, "/api/v1/scan", r#"{"image": "not a data url"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post_json(
        &app,
        "/api/v1/scan",
        r#"{"image": "data:image/png;base64,!!!not-base64!!!"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn scan_without_provider_is_unavailable() {
    let (app, _dir) = test_app(None);
    let (status, json) = post_json(
        &app,
        "/api/v1/scan",
        r#"{"image": "data:image/png;base64,aGVsbG8="}"#,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "VISION_UNAVAILABLE");
}

#[tokio::test]
async fn scan_with_unparseable_model_output_is_a_gateway_error() {
    let (app, _dir) = test_app(Some("Sorry, I cannot read that label."));
    let (status, json) = post_json(
        &app,
        "/api/v1/scan",
        r#"{"image": "data:image/png;base64,aGVsbG8="}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "VISION_FAILED");
}

#[tokio::test]
async fn metrics_count_operations() {
    let (app, _dir) = test_app(None);
    post_json(&app, "/api/v1/data", ADVIL_FRAGMENT).await;
    get(&app, "/api/v1/search?q=head").await;

    let (status, json) = get(&app, "/api/v1/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_merges"], 1);
    assert_eq!(json["total_searches"], 1);
    assert_eq!(json["medication_count"], 1);
    assert_eq!(json["effect_count"], 2);
    assert!(json["total_requests"].as_u64().unwrap() >= 3);
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let (app, _dir) = test_app(None);
    let (status, json) = get(&app, "/api/v1/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"].get("/api/v1/scan").is_some());
}

#[tokio::test]
async fn merged_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("graph.json").to_string_lossy().to_string();

    let mut config = PillgraphConfig::default();
    config.storage.snapshot_path = snapshot_path.clone();

    let store = Arc::new(GraphStore::open(&snapshot_path));
    let state = Arc::new(AppState::new(store, None, config.clone()));
    let app = build_router(state).unwrap();
    post_json(&app, "/api/v1/data", ADVIL_FRAGMENT).await;
    drop(app);

    // A new store over the same snapshot sees the merged data.
    let store = Arc::new(GraphStore::open(&snapshot_path));
    let state = Arc::new(AppState::new(store, None, config));
    let app = build_router(state).unwrap();
    let (status, json) = get(&app, "/api/v1/medications/advil").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Advil");
}
