//! # Data Models
//!
//! This module contains all the data models used throughout the Zenith CRM
//! sync service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod campaign;
pub mod connection;
pub mod records;
pub mod sync;

pub use campaign::{
    AdCopy, CampaignResult, CampaignSettings, CompetitorAnalysis, MetaData, SocialMediaContent,
};
pub use connection::{
    ConflictResolution, Connection, ConnectionPatch, ConnectionStatus, CrmCredentials, CrmProvider,
    FieldMapping, MappingDirection, SyncConfiguration, SyncSettings,
};
pub use records::{CampaignRecord, CompetitorAnalysisRecord, ContentAssetRecord, ContentAssetType};
pub use sync::{
    AutoSyncConfig, AutoSyncConfigPatch, HealthReport, LogLevel, SyncLogEntry, SyncOutcome,
    SyncRecordError,
};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "zenith-crm-sync".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
