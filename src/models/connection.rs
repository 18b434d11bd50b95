//! Connection model
//!
//! A `Connection` is one configured link to a CRM vendor, together with its
//! credentials, field mappings and sync settings. Connections are persisted
//! as a whole list by the [`crate::registry::ConnectionRegistry`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Supported CRM vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CrmProvider {
    Airtable,
    Salesforce,
    Hubspot,
}

impl CrmProvider {
    /// Stable snake_case slug, used in log fields and metric labels.
    pub fn slug(&self) -> &'static str {
        match self {
            CrmProvider::Airtable => "airtable",
            CrmProvider::Salesforce => "salesforce",
            CrmProvider::Hubspot => "hubspot",
        }
    }

    /// Human-readable vendor name used for default connection names.
    pub fn display_name(&self) -> &'static str {
        match self {
            CrmProvider::Airtable => "Airtable",
            CrmProvider::Salesforce => "Salesforce",
            CrmProvider::Hubspot => "HubSpot",
        }
    }
}

impl std::fmt::Display for CrmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Lifecycle status of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Error,
    Syncing,
    Disconnected,
}

/// Credential bundle for a connection. Which fields are populated depends on
/// the provider: Airtable uses `api_key` + `base_id`, OAuth vendors use the
/// token pair + `instance_url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CrmCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Airtable base identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    /// Salesforce/HubSpot instance URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
}

/// Direction of a single field mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MappingDirection {
    ToCrm,
    FromCrm,
    Bidirectional,
}

/// One source-to-target field translation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldMapping {
    pub source_field: String,
    pub target_field: String,
    pub direction: MappingDirection,
    #[serde(default)]
    pub required: bool,
}

/// Policy for reconciling divergent local/remote state.
///
/// Carried as configuration only: the current sync path is one-directional
/// (local to CRM) and never consults it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    CrmWins,
    ZenithWins,
    NewestWins,
    ManualReview,
}

/// Per-connection sync tuning.
///
/// The numeric floors (retry >= 0, batch >= 1, interval >= 1) are advisory
/// and not enforced at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncSettings {
    pub auto_sync: bool,
    pub sync_interval_minutes: u32,
    pub sync_on_create: bool,
    pub sync_on_update: bool,
    pub conflict_resolution: ConflictResolution,
    pub batch_size: usize,
    pub retry_attempts: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval_minutes: 30,
            sync_on_create: true,
            sync_on_update: false,
            conflict_resolution: ConflictResolution::NewestWins,
            batch_size: 10,
            retry_attempts: 3,
        }
    }
}

/// Full per-connection configuration: credentials, field mappings, settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncConfiguration {
    #[serde(default)]
    pub credentials: CrmCredentials,
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
    #[serde(default)]
    pub settings: SyncSettings,
}

/// One configured link to a CRM vendor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Connection {
    /// Unique identifier. Uniqueness is the only hard contract; ordering is
    /// incidental to the timestamp prefix.
    pub id: String,
    pub provider: CrmProvider,
    pub name: String,
    pub config: SyncConfiguration,
    /// Whether this connection participates in automatic sync. Activity for
    /// orchestration purposes additionally requires `status == connected`.
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    pub status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// True when this connection qualifies for automatic sync.
    pub fn is_usable(&self) -> bool {
        self.is_active && self.status == ConnectionStatus::Connected
    }
}

/// Partial update applied by [`crate::registry::ConnectionRegistry::update_connection`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionPatch {
    pub name: Option<String>,
    pub config: Option<SyncConfiguration>,
    pub is_active: Option<bool>,
    pub last_sync: Option<DateTime<Utc>>,
    pub status: Option<ConnectionStatus>,
    /// `Some(None)` clears the stored error message.
    pub error_message: Option<Option<String>>,
}
