//! Integration tests for the Airtable connector against a mock API

use serde_json::json;
use zenith_crm_sync::connectors::{
    AirtableConnector, BatchOperation, ConnectorError, CrmConnector, CrmContact, CrmObjectType,
    CrmRecord,
};
use zenith_crm_sync::models::CampaignRecord;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path, query_param},
};

fn connector(server: &MockServer) -> AirtableConnector {
    AirtableConnector::with_api_base(
        "test_api_key".to_string(),
        "appTestBase".to_string(),
        server.uri(),
    )
}

fn sample_campaign() -> CampaignRecord {
    CampaignRecord {
        name: "Acme - 2026-08-01".to_string(),
        campaign_type: "product_launch".to_string(),
        status: "generated".to_string(),
        product_description: "A smarter widget".to_string(),
        target_audience: "Widget buyers".to_string(),
        key_messaging: vec!["Faster".to_string(), "Cheaper".to_string()],
        company_name: "Acme".to_string(),
        company_website: "https://acme.example".to_string(),
        language: "en".to_string(),
        generated_at: chrono::Utc::now(),
        metadata: json!({"session_id": "sess-1"}),
    }
}

#[tokio::test]
async fn create_campaign_posts_mapped_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appTestBase/Campaigns"))
        .and(header("authorization", "Bearer test_api_key"))
        .and(body_partial_json(json!({
            "fields": {
                "Name": "Acme - 2026-08-01",
                "Type": "product_launch",
                "Key Messaging": "Faster\nCheaper",
                "Company Name": "Acme"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "recCampaign1",
            "fields": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = connector(&server)
        .create_campaign(&sample_campaign())
        .await
        .unwrap();
    assert_eq!(id, "recCampaign1");
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appTestBase/Campaigns"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"type": "AUTHENTICATION_REQUIRED"}
        })))
        .mount(&server)
        .await;

    let err = connector(&server)
        .create_campaign(&sample_campaign())
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Auth { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn rate_limit_carries_retry_after_hint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appTestBase/Campaigns"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let err = connector(&server)
        .create_campaign(&sample_campaign())
        .await
        .unwrap_err();

    match err {
        ConnectorError::RateLimited { retry_after_secs } => {
            assert_eq!(retry_after_secs, Some(30));
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
    assert!(
        ConnectorError::RateLimited {
            retry_after_secs: Some(30)
        }
        .is_retryable()
    );
}

#[tokio::test]
async fn server_errors_are_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appTestBase/Campaigns"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = connector(&server)
        .create_campaign(&sample_campaign())
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Http { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_connection_probes_campaigns_table() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appTestBase/Campaigns"))
        .and(query_param("maxRecords", "1"))
        .and(header("authorization", "Bearer test_api_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(connector(&server).test_connection().await.unwrap());
}

#[tokio::test]
async fn content_asset_table_name_is_path_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appTestBase/Content%20Assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "recAsset1"})))
        .expect(1)
        .mount(&server)
        .await;

    let asset = zenith_crm_sync::models::ContentAssetRecord {
        campaign_id: "recCampaign1".to_string(),
        content_type: zenith_crm_sync::models::ContentAssetType::SocialMedia,
        platform: Some("linkedin".to_string()),
        content: "post body".to_string(),
        metadata: json!({}),
        created_at: chrono::Utc::now(),
    };

    let id = connector(&server).create_content_asset(&asset).await.unwrap();
    assert_eq!(id, "recAsset1");
}

#[tokio::test]
async fn get_custom_fields_filters_standard_columns() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/meta/bases/appTestBase/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [
                {
                    "name": "Contacts",
                    "fields": [
                        {"name": "Name", "type": "singleLineText"},
                        {"name": "Email", "type": "email"},
                        {"name": "Lead Score", "type": "number"},
                        {"name": "Region", "type": "singleSelect"}
                    ]
                }
            ]
        })))
        .mount(&server)
        .await;

    let fields = connector(&server)
        .get_custom_fields(CrmObjectType::Contact)
        .await
        .unwrap();

    assert_eq!(fields.len(), 2);
    assert_eq!(fields["Lead Score"].field_type, "number");
    assert_eq!(fields["Region"].field_type, "singleSelect");
    assert!(!fields.contains_key("Name"));
    assert!(!fields.contains_key("Email"));
}

#[tokio::test]
async fn batch_sync_collects_per_record_errors() {
    let server = MockServer::start().await;

    // First contact succeeds, second is rejected by the vendor
    Mock::given(method("POST"))
        .and(path("/appTestBase/Contacts"))
        .and(body_partial_json(json!({"fields": {"Name": "Ada"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "recC1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/appTestBase/Contacts"))
        .and(body_partial_json(json!({"fields": {"Name": "Bob"}})))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid field"))
        .mount(&server)
        .await;

    let records = vec![
        CrmRecord::Contact(CrmContact {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            ..Default::default()
        }),
        CrmRecord::Contact(CrmContact {
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            ..Default::default()
        }),
    ];

    let outcome = connector(&server)
        .batch_sync(&records, BatchOperation::Create)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.records_processed, 2);
    assert_eq!(outcome.records_created, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(!outcome.errors[0].retryable);
}

#[tokio::test]
async fn update_without_id_is_a_config_error() {
    let server = MockServer::start().await;

    let records = vec![CrmRecord::Contact(CrmContact {
        name: "No Id".to_string(),
        email: "noid@example.com".to_string(),
        ..Default::default()
    })];

    let outcome = connector(&server)
        .batch_sync(&records, BatchOperation::Update)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].message.contains("without an id"));
}
