//! HTTP API integration tests exercising the full router over a real socket.

use std::sync::Arc;

use serde_json::{Value, json};
use zenith_crm_sync::server::{AppState, create_app};
use zenith_crm_sync::storage::{KeyValueStore, MemoryStore};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Spawn the app on an ephemeral port, returning its base URL.
async fn spawn_app(airtable_api_base: Option<String>) -> String {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let state = AppState::build(store, airtable_api_base);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn root_reports_service_info() {
    let base = spawn_app(None).await;

    let body: Value = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["service"], "zenith-crm-sync");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn connection_lifecycle_over_http() {
    let airtable = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/appApiBase/Campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .mount(&airtable)
        .await;

    let base = spawn_app(Some(airtable.uri())).await;
    let client = reqwest::Client::new();

    // Register a connection; the vendor probe passes
    let created: Value = client
        .post(format!("{}/connections", base))
        .json(&json!({
            "provider": "airtable",
            "config": {
                "credentials": {"api_key": "k", "base_id": "appApiBase"}
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(created["provider"], "airtable");
    assert_eq!(created["status"], "connected");
    assert_eq!(created["is_active"], true);
    // Credentials are never echoed back
    assert_eq!(created["has_api_key"], true);
    assert!(created.get("config").is_none());
    let id = created["id"].as_str().unwrap().to_string();

    // Listing shows it
    let listing: Value = client
        .get(format!("{}/connections", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["connections"].as_array().unwrap().len(), 1);

    // Re-test succeeds
    let test: Value = client
        .post(format!("{}/connections/{}/test", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(test["success"], true);

    // Toggle deactivates
    let toggled: Value = client
        .post(format!("{}/connections/{}/toggle", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["is_active"], false);

    // Delete, then 404 on a second delete
    let resp = client
        .delete(format!("{}/connections/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

    let resp = client
        .delete(format!("{}/connections/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/problem+json"
    );
}

#[tokio::test]
async fn failed_registration_persists_with_error_status() {
    let airtable = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/appBadBase/Campaigns"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&airtable)
        .await;

    let base = spawn_app(Some(airtable.uri())).await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("{}/connections", base))
        .json(&json!({
            "provider": "airtable",
            "config": {
                "credentials": {"api_key": "bad", "base_id": "appBadBase"}
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(created["status"], "error");
    assert_eq!(created["is_active"], false);
    assert!(created["error_message"].is_string());

    // Still listed despite the failed probe
    let listing: Value = client
        .get(format!("{}/connections", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["connections"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn config_patch_and_reset_round_trip() {
    let base = spawn_app(None).await;
    let client = reqwest::Client::new();

    let config: Value = client
        .get(format!("{}/sync/config", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(config["enabled"], true);
    assert_eq!(config["retry_attempts"], 3);
    assert_eq!(config["retry_delay_ms"], 1000);
    assert_eq!(config["batch_size"], 10);

    let patched: Value = client
        .patch(format!("{}/sync/config", base))
        .json(&json!({"enabled": false, "batch_size": 5}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(patched["enabled"], false);
    assert_eq!(patched["batch_size"], 5);
    // Untouched fields keep their values
    assert_eq!(patched["retry_attempts"], 3);

    let reset: Value = client
        .post(format!("{}/sync/config/reset", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reset["enabled"], true);
    assert_eq!(reset["batch_size"], 10);
}

#[tokio::test]
async fn trigger_sync_without_connection_warns() {
    let base = spawn_app(None).await;
    let client = reqwest::Client::new();

    let outcome: Value = client
        .post(format!("{}/sync/trigger", base))
        .json(&json!({
            "campaign_result": {
                "target_audience": "ops teams",
                "social_media_content": []
            },
            "product_description": "a widget"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(outcome["success"], true);
    let warnings = outcome["warnings"].as_array().unwrap();
    assert!(
        warnings
            .iter()
            .any(|w| w.as_str().unwrap().contains("No active CRM connection"))
    );
}

#[tokio::test]
async fn sync_status_and_logs_endpoints() {
    let base = spawn_app(None).await;
    let client = reqwest::Client::new();

    let status: Value = client
        .get(format!("{}/sync/status", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["enabled"], true);
    assert!(status["active_connection"].is_null());

    // Out-of-range limit is rejected
    let resp = client
        .get(format!("{}/sync/logs?limit=500", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let logs: Value = client
        .get(format!("{}/sync/logs", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(logs["logs"].is_array());
}

#[tokio::test]
async fn health_reflects_missing_connection() {
    let base = spawn_app(None).await;

    let report: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["config_valid"], true);
    assert_eq!(report["connection_available"], false);
    assert!(!report["recommendations"].as_array().unwrap().is_empty());
}
