//! Connection registry
//!
//! CRUD over configured CRM connections with whole-list persistence through
//! the key-value store. The registry is an explicitly constructed service
//! with injected store and factory dependencies; callers share it behind an
//! `Arc`.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::connectors::ConnectorFactory;
use crate::models::{
    Connection, ConnectionPatch, ConnectionStatus, CrmProvider, SyncConfiguration,
};
use crate::storage::KeyValueStore;

const CONNECTIONS_KEY: &str = "zenith_crm_connections";

/// Registry of configured CRM connections.
pub struct ConnectionRegistry {
    store: Arc<dyn KeyValueStore>,
    factory: Arc<dyn ConnectorFactory>,
    connections: Mutex<Vec<Connection>>,
}

impl ConnectionRegistry {
    /// Load the registry from the store. A corrupt persisted list resets to
    /// empty with a warning rather than failing startup.
    pub fn load(store: Arc<dyn KeyValueStore>, factory: Arc<dyn ConnectorFactory>) -> Self {
        let connections = match store.get(CONNECTIONS_KEY) {
            Some(raw) => match serde_json::from_str::<Vec<Connection>>(&raw) {
                Ok(list) => list,
                Err(err) => {
                    warn!(error = %err, "Persisted connection list is corrupt, resetting");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Self {
            store,
            factory,
            connections: Mutex::new(connections),
        }
    }

    /// Register a new connection.
    ///
    /// Tests connectivity at creation time: a passing test marks the
    /// connection active and connected, a failing one captures the error and
    /// marks it errored. Either way the connection is persisted and returned;
    /// a failed test is not a fatal error for registration.
    pub async fn add_connection(
        &self,
        provider: CrmProvider,
        config: SyncConfiguration,
    ) -> Connection {
        let now = Utc::now();
        let mut connection = Connection {
            id: generate_connection_id(),
            provider,
            name: format!("{} Connection", provider.display_name()),
            config,
            is_active: false,
            last_sync: None,
            status: ConnectionStatus::Disconnected,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        let test_result = match self.factory.connector_for(&connection) {
            Ok(connector) => connector.test_connection().await.map_err(|e| e.to_string()),
            Err(err) => Err(err.to_string()),
        };

        match test_result {
            Ok(true) => {
                connection.is_active = true;
                connection.status = ConnectionStatus::Connected;
                info!(connection_id = %connection.id, provider = %provider, "CRM connection registered");
            }
            Ok(false) => {
                connection.status = ConnectionStatus::Error;
                connection.error_message = Some("connection test failed".to_string());
            }
            Err(message) => {
                connection.status = ConnectionStatus::Error;
                connection.error_message = Some(message.clone());
                warn!(
                    connection_id = %connection.id,
                    provider = %provider,
                    error = %message,
                    "CRM connection test failed at registration"
                );
            }
        }

        let mut connections = self.connections.lock().unwrap();
        connections.push(connection.clone());
        self.persist(&connections);
        connection
    }

    /// Merge a patch into an existing connection. Returns `None` when the id
    /// is unknown.
    pub fn update_connection(&self, id: &str, patch: ConnectionPatch) -> Option<Connection> {
        let mut connections = self.connections.lock().unwrap();
        let connection = connections.iter_mut().find(|c| c.id == id)?;

        if let Some(name) = patch.name {
            connection.name = name;
        }
        if let Some(config) = patch.config {
            connection.config = config;
        }
        if let Some(is_active) = patch.is_active {
            connection.is_active = is_active;
        }
        if let Some(last_sync) = patch.last_sync {
            connection.last_sync = Some(last_sync);
        }
        if let Some(status) = patch.status {
            connection.status = status;
        }
        if let Some(error_message) = patch.error_message {
            connection.error_message = error_message;
        }
        connection.updated_at = Utc::now();

        let updated = connection.clone();
        self.persist(&connections);
        Some(updated)
    }

    /// Remove a connection and evict its cached connector instance.
    pub fn delete_connection(&self, id: &str) -> bool {
        let mut connections = self.connections.lock().unwrap();
        let before = connections.len();
        connections.retain(|c| c.id != id);
        let removed = connections.len() < before;
        if removed {
            self.factory.evict(id);
            self.persist(&connections);
            info!(connection_id = %id, "CRM connection deleted");
        }
        removed
    }

    /// Defensive copy of the full connection list.
    pub fn connections(&self) -> Vec<Connection> {
        self.connections.lock().unwrap().clone()
    }

    pub fn get_connection(&self, id: &str) -> Option<Connection> {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// First connection that is active and connected, if any.
    ///
    /// First-match semantics are deliberate: uniqueness of the active
    /// connection is not enforced at write time, so callers must not assume
    /// determinism when several connections qualify.
    pub fn active_connection(&self) -> Option<Connection> {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.is_usable())
            .cloned()
    }

    /// Serialize the whole list. Store failures are logged, never escalated:
    /// persistence is fire-and-forget relative to the in-memory mutation.
    fn persist(&self, connections: &[Connection]) {
        match serde_json::to_string(connections) {
            Ok(raw) => {
                if let Err(err) = self.store.set(CONNECTIONS_KEY, &raw) {
                    warn!(error = %err, "Failed to persist connection list");
                }
            }
            Err(err) => warn!(error = %err, "Failed to serialize connection list"),
        }
    }
}

/// Timestamp plus random suffix. Uniqueness is the only hard contract.
fn generate_connection_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("conn_{}_{}", Utc::now().timestamp_millis(), suffix)
}
