//! # Server Configuration
//!
//! This module contains the server setup and configuration for the CRM sync API.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::connectors::{ConnectorFactory, DefaultConnectorFactory};
use crate::error::ApiError;
use crate::handlers;
use crate::registry::ConnectionRegistry;
use crate::storage::{JsonFileStore, KeyValueStore};
use crate::sync_engine::SyncEngine;
use crate::sync_log::SyncLogBuffer;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub factory: Arc<dyn ConnectorFactory>,
    pub engine: Arc<SyncEngine>,
}

impl AppState {
    /// Build the full service graph on top of a key-value store.
    pub fn build(store: Arc<dyn KeyValueStore>, airtable_api_base: Option<String>) -> Self {
        let factory: Arc<dyn ConnectorFactory> = match airtable_api_base {
            Some(base) => Arc::new(DefaultConnectorFactory::with_airtable_api_base(base)),
            None => Arc::new(DefaultConnectorFactory::new()),
        };
        let registry = Arc::new(ConnectionRegistry::load(store.clone(), factory.clone()));
        let logs = Arc::new(SyncLogBuffer::load(store.clone()));
        let engine = Arc::new(SyncEngine::new(
            registry.clone(),
            factory.clone(),
            store,
            logs,
        ));

        Self {
            registry,
            factory,
            engine,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route(
            "/connections",
            get(handlers::connections::list_connections)
                .post(handlers::connections::create_connection),
        )
        .route(
            "/connections/{id}",
            delete(handlers::connections::delete_connection),
        )
        .route(
            "/connections/{id}/test",
            post(handlers::connections::test_connection),
        )
        .route(
            "/connections/{id}/toggle",
            post(handlers::connections::toggle_connection),
        )
        .route("/sync/trigger", post(handlers::sync::trigger_sync))
        .route("/sync/status", get(handlers::sync::sync_status))
        .route("/sync/logs", get(handlers::sync::sync_logs))
        .route(
            "/sync/config",
            get(handlers::config::get_config).patch(handlers::config::update_config),
        )
        .route("/sync/config/reset", post(handlers::config::reset_config))
        .route("/health", get(handlers::sync::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.data_dir)?;
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(config.state_file())?);
    let state = AppState::build(store, config.airtable_api_base.clone());
    let app = create_app(state);

    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::connections::list_connections,
        crate::handlers::connections::create_connection,
        crate::handlers::connections::delete_connection,
        crate::handlers::connections::test_connection,
        crate::handlers::connections::toggle_connection,
        crate::handlers::sync::trigger_sync,
        crate::handlers::sync::sync_status,
        crate::handlers::sync::sync_logs,
        crate::handlers::sync::health,
        crate::handlers::config::get_config,
        crate::handlers::config::update_config,
        crate::handlers::config::reset_config,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::AutoSyncConfig,
            crate::models::sync::AutoSyncConfigPatch,
            crate::models::SyncOutcome,
            crate::models::sync::SyncRecordError,
            crate::models::SyncLogEntry,
            crate::models::sync::LogLevel,
            crate::models::HealthReport,
            crate::models::CampaignResult,
            crate::models::CampaignSettings,
            crate::models::connection::ConnectionStatus,
            crate::models::connection::CrmProvider,
            crate::models::connection::SyncConfiguration,
            crate::models::connection::CrmCredentials,
            crate::models::connection::FieldMapping,
            crate::models::connection::MappingDirection,
            crate::models::connection::ConflictResolution,
            crate::models::connection::SyncSettings,
            crate::models::campaign::SocialMediaContent,
            crate::models::campaign::AdCopy,
            crate::models::campaign::MetaData,
            crate::models::campaign::CompetitorAnalysis,
            crate::handlers::connections::CreateConnectionRequest,
            crate::handlers::connections::ConnectionInfo,
            crate::handlers::connections::ConnectionsResponse,
            crate::handlers::connections::TestConnectionResponse,
            crate::handlers::sync::TriggerSyncRequest,
            crate::handlers::sync::SyncStatusResponse,
            crate::handlers::sync::SyncLogsResponse,
            ApiError,
        )
    ),
    info(
        title = "Zenith CRM Sync API",
        description = "API for syncing generated marketing campaigns into CRM systems",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
