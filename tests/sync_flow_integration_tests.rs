//! End-to-end sync flow tests: registry, engine and connector wired against
//! a mock Airtable API and a file-backed store.

use std::sync::Arc;

use serde_json::json;
use zenith_crm_sync::connectors::{ConnectorFactory, DefaultConnectorFactory};
use zenith_crm_sync::models::{
    AdCopy, CampaignResult, CampaignSettings, CompetitorAnalysis, ConnectionStatus,
    CrmCredentials, CrmProvider, SocialMediaContent, SyncConfiguration,
};
use zenith_crm_sync::registry::ConnectionRegistry;
use zenith_crm_sync::storage::{JsonFileStore, KeyValueStore};
use zenith_crm_sync::sync_engine::SyncEngine;
use zenith_crm_sync::sync_log::SyncLogBuffer;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

struct Env {
    engine: SyncEngine,
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn KeyValueStore>,
    _dir: tempfile::TempDir,
}

/// Wire the full service graph against a mock Airtable server and register
/// one Airtable connection.
async fn build_env(server: &MockServer) -> Env {
    // Registration probes the Campaigns table
    Mock::given(method("GET"))
        .and(path("/appFlowBase/Campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .mount(server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileStore::open(dir.path().join("state.json")).unwrap());
    let factory: Arc<dyn ConnectorFactory> =
        Arc::new(DefaultConnectorFactory::with_airtable_api_base(server.uri()));
    let registry = Arc::new(ConnectionRegistry::load(store.clone(), factory.clone()));

    let connection = registry
        .add_connection(
            CrmProvider::Airtable,
            SyncConfiguration {
                credentials: CrmCredentials {
                    api_key: Some("flow_key".to_string()),
                    base_id: Some("appFlowBase".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .await;
    assert_eq!(connection.status, ConnectionStatus::Connected);

    let logs = Arc::new(SyncLogBuffer::load(store.clone()));
    let engine = SyncEngine::new(registry.clone(), factory, store.clone(), logs);

    Env {
        engine,
        registry,
        store,
        _dir: dir,
    }
}

fn campaign_result() -> CampaignResult {
    CampaignResult {
        target_audience: "Mid-market operators".to_string(),
        key_messaging: vec!["Do more".to_string()],
        social_media_content: vec![SocialMediaContent {
            platform: "linkedin".to_string(),
            content: "launch post".to_string(),
        }],
        ad_copy: vec![AdCopy {
            headline: "New".to_string(),
            body: "Improved".to_string(),
        }],
        seo_keywords: vec!["widgets".to_string()],
        competitor_analysis: Some(vec![CompetitorAnalysis {
            competitor_name: "Rival Co".to_string(),
            strengths: vec!["brand".to_string()],
            weaknesses: vec!["price".to_string()],
            strategy: "undercut on price".to_string(),
            examples: None,
        }]),
        ..Default::default()
    }
}

#[tokio::test]
async fn full_airtable_sync_writes_all_record_kinds() {
    let server = MockServer::start().await;
    let env = build_env(&server).await;

    Mock::given(method("POST"))
        .and(path("/appFlowBase/Campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "recCamp"})))
        .expect(1)
        .mount(&server)
        .await;
    // 1 social + 1 ad copy + 1 seo aggregate
    Mock::given(method("POST"))
        .and(path("/appFlowBase/Content%20Assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "recAsset"})))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/appFlowBase/Competitor%20Analysis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "recComp"})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = env
        .engine
        .handle_automatic_sync(
            &campaign_result(),
            "A smarter widget",
            &CampaignSettings {
                company_name: "Acme".to_string(),
                ..Default::default()
            },
            None,
        )
        .await;

    assert!(outcome.success, "errors: {:?}", outcome.errors);
    assert_eq!(outcome.campaign_record_id.as_deref(), Some("recCamp"));
    assert_eq!(outcome.content_asset_ids.len(), 3);
    assert_eq!(outcome.competitor_analysis_ids.len(), 1);
    assert_eq!(outcome.records_created, 5);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.retry_attempts, 0);

    // The connection records the successful run
    let connection = env.registry.active_connection().unwrap();
    assert!(connection.last_sync.is_some());
    assert_eq!(connection.status, ConnectionStatus::Connected);

    // Audit trail captured the completion
    let logs = env.engine.recent_logs(10);
    assert!(logs.iter().any(|l| l.message.contains("sync completed")));
}

#[tokio::test]
async fn child_record_failures_do_not_flip_success() {
    let server = MockServer::start().await;
    let env = build_env(&server).await;

    Mock::given(method("POST"))
        .and(path("/appFlowBase/Campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "recCamp"})))
        .mount(&server)
        .await;
    // Every content asset write is rejected
    Mock::given(method("POST"))
        .and(path("/appFlowBase/Content%20Assets"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad field"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/appFlowBase/Competitor%20Analysis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "recComp"})))
        .mount(&server)
        .await;

    let outcome = env
        .engine
        .handle_automatic_sync(
            &campaign_result(),
            "desc",
            &CampaignSettings::default(),
            None,
        )
        .await;

    // Anchor record landed, so the run counts as a success with errors
    assert!(outcome.success);
    assert_eq!(outcome.content_asset_ids.len(), 0);
    assert_eq!(outcome.errors.len(), 3);
    assert!(outcome.errors.iter().all(|e| !e.retryable));
}

#[tokio::test]
async fn anchor_failure_exhausts_retries_and_marks_connection() {
    let server = MockServer::start().await;
    let env = build_env(&server).await;

    Mock::given(method("POST"))
        .and(path("/appFlowBase/Campaigns"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        // retry_attempts=3 means 4 attempts total
        .expect(4)
        .mount(&server)
        .await;

    // Keep the test fast; backoff is real time here
    env.engine
        .update_config(&zenith_crm_sync::models::sync::AutoSyncConfigPatch {
            retry_delay_ms: Some(10),
            ..Default::default()
        });

    let outcome = env
        .engine
        .handle_automatic_sync(
            &campaign_result(),
            "desc",
            &CampaignSettings::default(),
            None,
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.retry_attempts, 3);

    let connection = env.registry.connections().into_iter().next().unwrap();
    assert_eq!(connection.status, ConnectionStatus::Error);
    assert!(connection.error_message.is_some());

    // Failure is recorded in the audit log
    let logs = env.engine.recent_logs(10);
    assert!(logs.iter().any(|l| l.message.contains("exhausting retries")));
}

#[tokio::test]
async fn state_survives_store_reopen() {
    let server = MockServer::start().await;
    let env = build_env(&server).await;

    env.engine
        .update_config(&zenith_crm_sync::models::sync::AutoSyncConfigPatch {
            batch_size: Some(25),
            ..Default::default()
        });

    let connection_id = env.registry.connections()[0].id.clone();

    // Rebuild the whole graph over the same store
    let factory: Arc<dyn ConnectorFactory> =
        Arc::new(DefaultConnectorFactory::with_airtable_api_base(server.uri()));
    let registry = Arc::new(ConnectionRegistry::load(env.store.clone(), factory.clone()));
    let logs = Arc::new(SyncLogBuffer::load(env.store.clone()));
    let engine = SyncEngine::new(registry.clone(), factory, env.store.clone(), logs);

    assert_eq!(registry.connections().len(), 1);
    assert_eq!(registry.connections()[0].id, connection_id);
    assert_eq!(engine.config().batch_size, 25);
}
