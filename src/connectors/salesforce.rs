//! Salesforce connector (not yet implemented)
//!
//! Placeholder integration: every operation reports a typed
//! [`ConnectorError::NotSupported`](crate::connectors::ConnectorError) via
//! the trait defaults. The sync engine treats the vendor as a non-fatal
//! no-op until the real OAuth + REST integration lands.

use crate::connectors::trait_::CrmConnector;
use crate::models::{CrmCredentials, CrmProvider};

#[derive(Debug)]
pub struct SalesforceConnector {
    #[allow(dead_code)]
    credentials: CrmCredentials,
}

impl SalesforceConnector {
    pub fn new(credentials: CrmCredentials) -> Self {
        Self { credentials }
    }
}

impl CrmConnector for SalesforceConnector {
    fn provider(&self) -> CrmProvider {
        CrmProvider::Salesforce
    }
}
