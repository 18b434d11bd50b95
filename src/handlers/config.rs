//! # Auto-Sync Configuration Handlers
//!
//! Read, patch and reset the process-wide auto-sync configuration. Every
//! mutation is persisted before the response is returned.

use crate::models::{AutoSyncConfig, AutoSyncConfigPatch};
use crate::server::AppState;
use axum::{extract::State, response::Json};

/// Returns the current auto-sync configuration
#[utoipa::path(
    get,
    path = "/sync/config",
    responses(
        (status = 200, description = "Current configuration", body = AutoSyncConfig)
    ),
    tag = "config"
)]
pub async fn get_config(State(state): State<AppState>) -> Json<AutoSyncConfig> {
    Json(state.engine.config())
}

/// Merges a partial update into the auto-sync configuration
#[utoipa::path(
    patch,
    path = "/sync/config",
    request_body = AutoSyncConfigPatch,
    responses(
        (status = 200, description = "Updated configuration", body = AutoSyncConfig)
    ),
    tag = "config"
)]
pub async fn update_config(
    State(state): State<AppState>,
    Json(patch): Json<AutoSyncConfigPatch>,
) -> Json<AutoSyncConfig> {
    Json(state.engine.update_config(&patch))
}

/// Resets the auto-sync configuration to its documented defaults
#[utoipa::path(
    post,
    path = "/sync/config/reset",
    responses(
        (status = 200, description = "Default configuration", body = AutoSyncConfig)
    ),
    tag = "config"
)]
pub async fn reset_config(State(state): State<AppState>) -> Json<AutoSyncConfig> {
    Json(state.engine.reset_config())
}
