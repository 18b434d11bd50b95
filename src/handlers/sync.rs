//! # Sync API Handlers
//!
//! Handlers for triggering syncs, inspecting sync status, reading the audit
//! log and the operational health check.

use crate::error::ApiError;
use crate::models::{
    CampaignResult, CampaignSettings, HealthReport, SyncLogEntry, SyncOutcome,
};
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::connections::ConnectionInfo;

/// Request body for a manually triggered sync
#[derive(Debug, Deserialize, ToSchema)]
pub struct TriggerSyncRequest {
    pub campaign_result: CampaignResult,
    pub product_description: String,
    #[serde(default)]
    pub settings: CampaignSettings,
    /// Optional caller metadata; a `session_id` key is honored as the sync
    /// session identifier.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Current sync state summary
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncStatusResponse {
    /// Whether automatic sync is enabled
    pub enabled: bool,
    /// Whether generation events trigger a sync
    pub sync_on_generation: bool,
    /// The connection that would serve the next sync, if any
    pub active_connection: Option<ConnectionInfo>,
    /// Timestamp of the most recent successful sync
    pub last_sync: Option<DateTime<Utc>>,
}

/// Query parameters for the sync log listing
#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct SyncLogsQuery {
    /// Maximum number of entries to return (default: 50, max: 100)
    pub limit: Option<usize>,
}

/// Response wrapper for the sync log listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncLogsResponse {
    /// Audit log entries, newest first
    pub logs: Vec<SyncLogEntry>,
}

/// Triggers a sync run for the supplied campaign result.
///
/// Runs even when generation-triggered sync is disabled; the configuration
/// is restored afterwards. Sync failures are reported in the outcome body,
/// never as an HTTP error.
#[utoipa::path(
    post,
    path = "/sync/trigger",
    request_body = TriggerSyncRequest,
    responses(
        (status = 200, description = "Sync outcome", body = SyncOutcome),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn trigger_sync(
    State(state): State<AppState>,
    Json(request): Json<TriggerSyncRequest>,
) -> Json<SyncOutcome> {
    let outcome = state
        .engine
        .trigger_manual_sync(
            &request.campaign_result,
            &request.product_description,
            &request.settings,
            request.metadata,
        )
        .await;
    Json(outcome)
}

/// Reports the current sync state
#[utoipa::path(
    get,
    path = "/sync/status",
    responses(
        (status = 200, description = "Sync status", body = SyncStatusResponse)
    ),
    tag = "sync"
)]
pub async fn sync_status(State(state): State<AppState>) -> Json<SyncStatusResponse> {
    let config = state.engine.config();
    let active = state.registry.active_connection();
    let last_sync = active.as_ref().and_then(|c| c.last_sync);

    Json(SyncStatusResponse {
        enabled: config.enabled,
        sync_on_generation: config.sync_on_generation,
        active_connection: active.map(ConnectionInfo::from),
        last_sync,
    })
}

/// Lists recent sync audit log entries
#[utoipa::path(
    get,
    path = "/sync/logs",
    params(SyncLogsQuery),
    responses(
        (status = 200, description = "Recent sync logs", body = SyncLogsResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn sync_logs(
    State(state): State<AppState>,
    Query(query): Query<SyncLogsQuery>,
) -> Result<Json<SyncLogsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    if !(1..=100).contains(&limit) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "limit must be between 1 and 100",
        ));
    }

    Ok(Json(SyncLogsResponse {
        logs: state.engine.recent_logs(limit),
    }))
}

/// Reports sync subsystem health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health report", body = HealthReport)
    ),
    tag = "sync"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.engine.health_check())
}
