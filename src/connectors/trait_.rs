//! CRM connector trait definition
//!
//! Defines the standard capability surface that all CRM vendor
//! implementations must follow. The sync engine depends only on this
//! interface, never on vendor specifics directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    CampaignRecord, CompetitorAnalysisRecord, ContentAssetRecord, CrmProvider, SyncOutcome,
};

/// Connector-specific error types for structured error handling
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectorError {
    /// HTTP error from the upstream vendor API
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    /// Network or connectivity error
    #[error("network error: {details}")]
    Network { details: String, retryable: bool },
    /// Authentication/authorization error
    #[error("authentication error: {details}")]
    Auth { details: String },
    /// Rate limiting error with optional retry hint
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },
    /// Configuration or setup error (missing credentials, bad base id)
    #[error("configuration error: {details}")]
    Config { details: String },
    /// The vendor integration does not implement this operation.
    ///
    /// A typed result rather than a thrown "not implemented": callers can
    /// distinguish "this vendor isn't built yet" from "this request failed".
    #[error("{provider} does not support {operation}")]
    NotSupported {
        provider: CrmProvider,
        operation: &'static str,
    },
}

impl ConnectorError {
    /// Whether the outer retry loop may reasonably try this again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConnectorError::Http { status, .. } => *status == 429 || *status >= 500,
            ConnectorError::Network { retryable, .. } => *retryable,
            ConnectorError::RateLimited { .. } => true,
            ConnectorError::Auth { .. }
            | ConnectorError::Config { .. }
            | ConnectorError::NotSupported { .. } => false,
        }
    }

    pub fn not_supported(provider: CrmProvider, operation: &'static str) -> Self {
        ConnectorError::NotSupported {
            provider,
            operation,
        }
    }
}

/// Canonical contact shape shared across vendors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

/// Canonical deal shape shared across vendors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmDeal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

/// Canonical company shape shared across vendors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmCompany {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

/// Record wrapper for uniform batch processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrmRecord {
    Contact(CrmContact),
    Deal(CrmDeal),
    Company(CrmCompany),
    Campaign(CampaignRecord),
}

/// Operation applied uniformly by [`CrmConnector::batch_sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperation {
    Create,
    Update,
}

/// Vendor schema descriptor for a custom/extension field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDescriptor {
    pub label: String,
    pub field_type: String,
    pub required: bool,
}

/// Entity kinds a connector can introspect custom fields for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrmObjectType {
    Contact,
    Deal,
    Company,
    Campaign,
}

impl CrmObjectType {
    pub fn table_name(&self) -> &'static str {
        match self {
            CrmObjectType::Contact => "Contacts",
            CrmObjectType::Deal => "Deals",
            CrmObjectType::Company => "Companies",
            CrmObjectType::Campaign => "Campaigns",
        }
    }
}

/// Uniform capability surface over heterogeneous CRM backends.
///
/// Every write operation is a live network call to the vendor API; connectors
/// never retry internally (retry belongs to the sync engine) and never stage
/// or queue records locally.
///
/// All operations default to a typed [`ConnectorError::NotSupported`] so that
/// not-yet-built vendors only implement [`CrmConnector::provider`]; built
/// vendors override the full surface.
#[async_trait]
pub trait CrmConnector: Send + Sync + std::fmt::Debug {
    /// Vendor tag this connector serves.
    fn provider(&self) -> CrmProvider;

    /// Perform the vendor-specific authentication handshake.
    async fn authenticate(&self) -> Result<(), ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "authenticate"))
    }

    /// Refresh an expired access token, where the vendor supports it.
    async fn refresh_token(&self) -> Result<(), ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "token refresh"))
    }

    /// Liveness check used at connection-registration time and for manual
    /// "test" actions. Must not mutate remote state.
    async fn test_connection(&self) -> Result<bool, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "connection test"))
    }

    async fn create_contact(&self, _contact: &CrmContact) -> Result<String, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "create contact"))
    }

    async fn update_contact(&self, _id: &str, _contact: &CrmContact) -> Result<(), ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "update contact"))
    }

    async fn get_contact(&self, _id: &str) -> Result<CrmContact, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "get contact"))
    }

    async fn search_contacts(&self, _query: &str) -> Result<Vec<CrmContact>, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "contact search"))
    }

    async fn create_deal(&self, _deal: &CrmDeal) -> Result<String, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "create deal"))
    }

    async fn update_deal(&self, _id: &str, _deal: &CrmDeal) -> Result<(), ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "update deal"))
    }

    async fn get_deal(&self, _id: &str) -> Result<CrmDeal, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "get deal"))
    }

    async fn create_company(&self, _company: &CrmCompany) -> Result<String, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "create company"))
    }

    async fn update_company(&self, _id: &str, _company: &CrmCompany) -> Result<(), ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "update company"))
    }

    async fn get_company(&self, _id: &str) -> Result<CrmCompany, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "get company"))
    }

    async fn create_campaign(&self, _campaign: &CampaignRecord) -> Result<String, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "create campaign"))
    }

    async fn update_campaign(
        &self,
        _id: &str,
        _campaign: &CampaignRecord,
    ) -> Result<(), ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "update campaign"))
    }

    async fn get_campaign(&self, _id: &str) -> Result<CampaignRecord, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "get campaign"))
    }

    /// Create one derived content asset referencing the anchor campaign.
    async fn create_content_asset(
        &self,
        _asset: &ContentAssetRecord,
    ) -> Result<String, ConnectorError> {
        Err(ConnectorError::not_supported(
            self.provider(),
            "create content asset",
        ))
    }

    /// Create one competitor analysis referencing the anchor campaign.
    async fn create_competitor_analysis(
        &self,
        _analysis: &CompetitorAnalysisRecord,
    ) -> Result<String, ConnectorError> {
        Err(ConnectorError::not_supported(
            self.provider(),
            "create competitor analysis",
        ))
    }

    /// Introspect the vendor schema for custom/extension fields.
    async fn get_custom_fields(
        &self,
        _object_type: CrmObjectType,
    ) -> Result<BTreeMap<String, CustomFieldDescriptor>, ConnectorError> {
        Err(ConnectorError::not_supported(
            self.provider(),
            "custom field introspection",
        ))
    }

    /// Apply `operation` uniformly across a record list.
    ///
    /// Individual record failures do not abort the batch; they are collected
    /// as per-record errors while processing continues.
    async fn batch_sync(
        &self,
        _records: &[CrmRecord],
        _operation: BatchOperation,
    ) -> Result<SyncOutcome, ConnectorError> {
        Err(ConnectorError::not_supported(self.provider(), "batch sync"))
    }
}
