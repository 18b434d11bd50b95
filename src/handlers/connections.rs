//! # Connections API Handlers
//!
//! Handlers for managing CRM connections: listing, registration with a
//! connectivity test, deletion, re-testing and activation toggling.
//! Credentials never appear in responses, only `has_*` presence flags.

use crate::error::{ApiError, not_found};
use crate::models::{
    Connection, ConnectionPatch, ConnectionStatus, CrmProvider, SyncConfiguration,
};
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for registering a new CRM connection
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateConnectionRequest {
    pub provider: CrmProvider,
    pub config: SyncConfiguration,
}

/// Connection information for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionInfo {
    /// Unique identifier for the connection
    pub id: String,
    /// Provider slug (e.g., "airtable")
    pub provider: String,
    pub name: String,
    pub is_active: bool,
    pub status: ConnectionStatus,
    pub last_sync: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Indicates whether an API key is stored for this connection
    #[schema(default = false, example = true)]
    pub has_api_key: bool,
    /// Indicates whether an OAuth access token is stored
    #[schema(default = false, example = false)]
    pub has_access_token: bool,
}

impl From<Connection> for ConnectionInfo {
    fn from(connection: Connection) -> Self {
        Self {
            id: connection.id,
            provider: connection.provider.slug().to_string(),
            name: connection.name,
            is_active: connection.is_active,
            status: connection.status,
            last_sync: connection.last_sync,
            error_message: connection.error_message,
            created_at: connection.created_at,
            updated_at: connection.updated_at,
            has_api_key: connection.config.credentials.api_key.is_some(),
            has_access_token: connection.config.credentials.access_token.is_some(),
        }
    }
}

/// Response wrapper for connection listings
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionsResponse {
    pub connections: Vec<ConnectionInfo>,
}

/// Result of an on-demand connectivity test
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TestConnectionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Lists all configured CRM connections
#[utoipa::path(
    get,
    path = "/connections",
    responses(
        (status = 200, description = "List of configured connections", body = ConnectionsResponse)
    ),
    tag = "connections"
)]
pub async fn list_connections(State(state): State<AppState>) -> Json<ConnectionsResponse> {
    let connections = state
        .registry
        .connections()
        .into_iter()
        .map(ConnectionInfo::from)
        .collect();
    Json(ConnectionsResponse { connections })
}

/// Registers a new CRM connection.
///
/// The connection is tested against the vendor immediately; a failed test
/// still persists the connection with `status = error` so operators can fix
/// credentials in place.
#[utoipa::path(
    post,
    path = "/connections",
    request_body = CreateConnectionRequest,
    responses(
        (status = 201, description = "Connection registered", body = ConnectionInfo),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn create_connection(
    State(state): State<AppState>,
    Json(request): Json<CreateConnectionRequest>,
) -> (StatusCode, Json<ConnectionInfo>) {
    let connection = state
        .registry
        .add_connection(request.provider, request.config)
        .await;
    (StatusCode::CREATED, Json(connection.into()))
}

/// Deletes a CRM connection
#[utoipa::path(
    delete,
    path = "/connections/{id}",
    params(("id" = String, Path, description = "Connection identifier")),
    responses(
        (status = 204, description = "Connection deleted"),
        (status = 404, description = "Unknown connection", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn delete_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.registry.delete_connection(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&format!("Connection not found: {}", id)))
    }
}

/// Re-tests an existing connection against its vendor, updating its status
#[utoipa::path(
    post,
    path = "/connections/{id}/test",
    params(("id" = String, Path, description = "Connection identifier")),
    responses(
        (status = 200, description = "Test result", body = TestConnectionResponse),
        (status = 404, description = "Unknown connection", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn test_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TestConnectionResponse>, ApiError> {
    let connection = state
        .registry
        .get_connection(&id)
        .ok_or_else(|| not_found(&format!("Connection not found: {}", id)))?;

    let result = match state.factory.connector_for(&connection) {
        Ok(connector) => connector.test_connection().await,
        Err(err) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                &format!("Connection is not testable: {}", err),
            ));
        }
    };

    let response = match result {
        Ok(true) => {
            state.registry.update_connection(
                &id,
                ConnectionPatch {
                    status: Some(ConnectionStatus::Connected),
                    error_message: Some(None),
                    ..Default::default()
                },
            );
            TestConnectionResponse {
                success: true,
                error: None,
            }
        }
        Ok(false) => {
            state.registry.update_connection(
                &id,
                ConnectionPatch {
                    status: Some(ConnectionStatus::Error),
                    error_message: Some(Some("connection test failed".to_string())),
                    ..Default::default()
                },
            );
            TestConnectionResponse {
                success: false,
                error: Some("connection test failed".to_string()),
            }
        }
        Err(err) => {
            let message = err.to_string();
            state.registry.update_connection(
                &id,
                ConnectionPatch {
                    status: Some(ConnectionStatus::Error),
                    error_message: Some(Some(message.clone())),
                    ..Default::default()
                },
            );
            TestConnectionResponse {
                success: false,
                error: Some(message),
            }
        }
    };

    Ok(Json(response))
}

/// Toggles whether a connection participates in automatic sync
#[utoipa::path(
    post,
    path = "/connections/{id}/toggle",
    params(("id" = String, Path, description = "Connection identifier")),
    responses(
        (status = 200, description = "Updated connection", body = ConnectionInfo),
        (status = 404, description = "Unknown connection", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn toggle_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionInfo>, ApiError> {
    let connection = state
        .registry
        .get_connection(&id)
        .ok_or_else(|| not_found(&format!("Connection not found: {}", id)))?;

    let updated = state
        .registry
        .update_connection(
            &id,
            ConnectionPatch {
                is_active: Some(!connection.is_active),
                ..Default::default()
            },
        )
        .ok_or_else(|| not_found(&format!("Connection not found: {}", id)))?;

    Ok(Json(updated.into()))
}
