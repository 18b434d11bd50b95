//! Connector factory
//!
//! Builds provider connectors for configured connections and caches instances
//! per connection id. The factory is injected into the registry and the sync
//! engine rather than living behind a global, which keeps tests isolated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::connectors::airtable::AirtableConnector;
use crate::connectors::hubspot::HubspotConnector;
use crate::connectors::salesforce::SalesforceConnector;
use crate::connectors::trait_::{ConnectorError, CrmConnector};
use crate::models::{Connection, CrmProvider};

/// Error type for factory operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum FactoryError {
    #[error("connection '{connection_id}' is missing required credentials: {details}")]
    MissingCredentials {
        connection_id: String,
        details: String,
    },
}

impl From<FactoryError> for ConnectorError {
    fn from(err: FactoryError) -> Self {
        ConnectorError::Config {
            details: err.to_string(),
        }
    }
}

/// Builds and caches connectors for connections.
pub trait ConnectorFactory: Send + Sync {
    /// Connector bound to the given connection, reusing a cached instance
    /// where one exists.
    fn connector_for(&self, connection: &Connection)
    -> Result<Arc<dyn CrmConnector>, FactoryError>;

    /// Drop the cached connector for a deleted connection.
    fn evict(&self, connection_id: &str);
}

/// Production factory keyed by provider tag.
pub struct DefaultConnectorFactory {
    /// Airtable API base override, used to point connectors at a mock server.
    airtable_api_base: Option<String>,
    cache: Mutex<HashMap<String, Arc<dyn CrmConnector>>>,
}

impl DefaultConnectorFactory {
    pub fn new() -> Self {
        Self {
            airtable_api_base: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_airtable_api_base(api_base: String) -> Self {
        Self {
            airtable_api_base: Some(api_base),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn build(&self, connection: &Connection) -> Result<Arc<dyn CrmConnector>, FactoryError> {
        let credentials = &connection.config.credentials;
        match connection.provider {
            CrmProvider::Airtable => {
                let api_key = credentials.api_key.clone().ok_or_else(|| {
                    FactoryError::MissingCredentials {
                        connection_id: connection.id.clone(),
                        details: "Airtable requires an api_key".to_string(),
                    }
                })?;
                let base_id = credentials.base_id.clone().ok_or_else(|| {
                    FactoryError::MissingCredentials {
                        connection_id: connection.id.clone(),
                        details: "Airtable requires a base_id".to_string(),
                    }
                })?;
                let connector = match &self.airtable_api_base {
                    Some(api_base) => {
                        AirtableConnector::with_api_base(api_key, base_id, api_base.clone())
                    }
                    None => AirtableConnector::new(api_key, base_id),
                };
                Ok(Arc::new(connector))
            }
            CrmProvider::Salesforce => {
                Ok(Arc::new(SalesforceConnector::new(credentials.clone())))
            }
            CrmProvider::Hubspot => Ok(Arc::new(HubspotConnector::new(credentials.clone()))),
        }
    }
}

impl Default for DefaultConnectorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorFactory for DefaultConnectorFactory {
    fn connector_for(
        &self,
        connection: &Connection,
    ) -> Result<Arc<dyn CrmConnector>, FactoryError> {
        let mut cache = self.cache.lock().unwrap();
        if let Some(connector) = cache.get(&connection.id) {
            return Ok(connector.clone());
        }
        let connector = self.build(connection)?;
        cache.insert(connection.id.clone(), connector.clone());
        Ok(connector)
    }

    fn evict(&self, connection_id: &str) {
        self.cache.lock().unwrap().remove(connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Connection, ConnectionStatus, CrmCredentials, CrmProvider, SyncConfiguration,
    };
    use chrono::Utc;

    fn connection(provider: CrmProvider, credentials: CrmCredentials) -> Connection {
        Connection {
            id: "conn_test_1".to_string(),
            provider,
            name: provider.display_name().to_string(),
            config: SyncConfiguration {
                credentials,
                ..Default::default()
            },
            is_active: false,
            last_sync: None,
            status: ConnectionStatus::Disconnected,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn airtable_requires_credentials() {
        let factory = DefaultConnectorFactory::new();
        let conn = connection(CrmProvider::Airtable, CrmCredentials::default());
        let err = factory.connector_for(&conn).unwrap_err();
        assert!(matches!(err, FactoryError::MissingCredentials { .. }));
    }

    #[test]
    fn caches_instances_until_evicted() {
        let factory = DefaultConnectorFactory::new();
        let conn = connection(
            CrmProvider::Airtable,
            CrmCredentials {
                api_key: Some("key".to_string()),
                base_id: Some("appBase".to_string()),
                ..Default::default()
            },
        );

        let first = factory.connector_for(&conn).unwrap();
        let second = factory.connector_for(&conn).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        factory.evict(&conn.id);
        let third = factory.connector_for(&conn).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn stub_providers_always_build() {
        let factory = DefaultConnectorFactory::new();
        for provider in [CrmProvider::Salesforce, CrmProvider::Hubspot] {
            let conn = connection(provider, CrmCredentials::default());
            let connector = factory.connector_for(&conn).unwrap();
            assert_eq!(connector.provider(), provider);
        }
    }
}
