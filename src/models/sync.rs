//! Sync outcome, auto-sync configuration and audit log types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Process-wide auto-sync configuration.
///
/// Loaded from the persisted store at startup, mutated via explicit
/// update/reset calls; each mutation is persisted immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AutoSyncConfig {
    pub enabled: bool,
    pub sync_on_generation: bool,
    pub sync_on_update: bool,
    pub include_content_assets: bool,
    pub include_competitor_analysis: bool,
    pub include_analytics: bool,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub batch_size: usize,
}

impl Default for AutoSyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sync_on_generation: true,
            sync_on_update: false,
            include_content_assets: true,
            include_competitor_analysis: true,
            include_analytics: false,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            batch_size: 10,
        }
    }
}

/// Partial update for [`AutoSyncConfig`]; `None` fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AutoSyncConfigPatch {
    pub enabled: Option<bool>,
    pub sync_on_generation: Option<bool>,
    pub sync_on_update: Option<bool>,
    pub include_content_assets: Option<bool>,
    pub include_competitor_analysis: Option<bool>,
    pub include_analytics: Option<bool>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub batch_size: Option<usize>,
}

impl AutoSyncConfig {
    /// Merge a patch into this configuration.
    pub fn apply(&mut self, patch: &AutoSyncConfigPatch) {
        if let Some(v) = patch.enabled {
            self.enabled = v;
        }
        if let Some(v) = patch.sync_on_generation {
            self.sync_on_generation = v;
        }
        if let Some(v) = patch.sync_on_update {
            self.sync_on_update = v;
        }
        if let Some(v) = patch.include_content_assets {
            self.include_content_assets = v;
        }
        if let Some(v) = patch.include_competitor_analysis {
            self.include_competitor_analysis = v;
        }
        if let Some(v) = patch.include_analytics {
            self.include_analytics = v;
        }
        if let Some(v) = patch.retry_attempts {
            self.retry_attempts = v;
        }
        if let Some(v) = patch.retry_delay_ms {
            self.retry_delay_ms = v;
        }
        if let Some(v) = patch.batch_size {
            self.batch_size = v;
        }
    }
}

/// Structured error collected for one record during a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncRecordError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub message: String,
    pub retryable: bool,
}

impl SyncRecordError {
    pub fn retryable<S: Into<String>>(record_id: Option<String>, message: S) -> Self {
        Self {
            record_id,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent<S: Into<String>>(record_id: Option<String>, message: S) -> Self {
        Self {
            record_id,
            message: message.into(),
            retryable: false,
        }
    }
}

/// Outcome of one orchestration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncOutcome {
    pub success: bool,
    pub records_processed: u64,
    pub records_created: u64,
    pub records_updated: u64,
    pub records_skipped: u64,
    #[serde(default)]
    pub errors: Vec<SyncRecordError>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub duration_ms: u64,
    /// Number of retries actually consumed (0 when the first attempt wins).
    pub retry_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_asset_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub competitor_analysis_ids: Vec<String>,
}

impl SyncOutcome {
    /// Skipped no-op result used when auto-sync is disabled.
    pub fn skipped() -> Self {
        Self {
            success: true,
            records_skipped: 1,
            ..Default::default()
        }
    }

    /// Successful no-op result carrying a warning.
    pub fn warning<S: Into<String>>(message: S) -> Self {
        Self {
            success: true,
            warnings: vec![message.into()],
            ..Default::default()
        }
    }
}

/// Severity of a sync log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One entry in the append-only sync audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read-only diagnostic summary produced by the health check.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    /// Auto-sync config passes sanity checks (retry/delay/batch all > 0).
    pub config_valid: bool,
    /// An active, connected CRM connection exists.
    pub connection_available: bool,
    /// Recent log entries contain errors.
    pub recent_errors: bool,
    /// Plain-language operator recommendations.
    pub recommendations: Vec<String>,
}
