//! HubSpot connector (not yet implemented)
//!
//! Placeholder integration mirroring the Salesforce stub: every operation
//! reports a typed NotSupported result via the trait defaults.

use crate::connectors::trait_::CrmConnector;
use crate::models::{CrmCredentials, CrmProvider};

#[derive(Debug)]
pub struct HubspotConnector {
    #[allow(dead_code)]
    credentials: CrmCredentials,
}

impl HubspotConnector {
    pub fn new(credentials: CrmCredentials) -> Self {
        Self { credentials }
    }
}

impl CrmConnector for HubspotConnector {
    fn provider(&self) -> CrmProvider {
        CrmProvider::Hubspot
    }
}
