//! Connectors module
//!
//! This module provides the CRM connector SDK including:
//! - The `CrmConnector` trait defining the capability surface all vendor
//!   implementations share
//! - The connector factory used to build and cache per-connection instances
//! - Individual vendor implementations (Airtable full, Salesforce/HubSpot
//!   placeholders)

pub mod airtable;
pub mod factory;
pub mod hubspot;
pub mod salesforce;
pub mod trait_;

pub use airtable::AirtableConnector;
pub use factory::{ConnectorFactory, DefaultConnectorFactory, FactoryError};
pub use hubspot::HubspotConnector;
pub use salesforce::SalesforceConnector;
pub use trait_::{
    BatchOperation, ConnectorError, CrmCompany, CrmConnector, CrmContact, CrmDeal, CrmObjectType,
    CrmRecord, CustomFieldDescriptor,
};
