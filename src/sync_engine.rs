//! Sync Engine
//!
//! Orchestrates CRM synchronization for campaign generation events: maps a
//! [`CampaignResult`] onto CRM records, executes the write sequence against
//! the active connection's connector with retry and batching, and records
//! structured audit logs. Also owns the process-wide auto-sync configuration
//! and the operational health check.
//!
//! Error policy: public entry points never return `Err` for sync failures;
//! every path terminates in a [`SyncOutcome`] value. A failed sync must never
//! block the campaign generation flow that triggered it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, histogram};
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::connectors::{ConnectorError, ConnectorFactory, FactoryError};
use crate::models::{
    AutoSyncConfig, AutoSyncConfigPatch, CampaignRecord, CampaignResult, CampaignSettings,
    CompetitorAnalysisRecord, Connection, ConnectionPatch, ConnectionStatus, ContentAssetRecord,
    ContentAssetType, CrmProvider, HealthReport, LogLevel, SyncOutcome, SyncRecordError,
};
use crate::registry::ConnectionRegistry;
use crate::storage::KeyValueStore;
use crate::sync_log::SyncLogBuffer;

const AUTOSYNC_CONFIG_KEY: &str = "zenith_crm_autosync_config";

/// Pause between content-asset batches to avoid rate-limit bursts.
const BATCH_PAUSE_MS: u64 = 200;

/// Internal error type for one sync attempt.
#[derive(Debug, thiserror::Error)]
enum SyncAttemptError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// Everything the orchestrator needs for one sync run.
#[derive(Debug, Clone)]
pub struct SyncPayload {
    pub campaign_result: CampaignResult,
    pub product_description: String,
    pub settings: CampaignSettings,
    pub session_id: String,
    pub metadata: Option<serde_json::Value>,
}

/// CRM sync orchestrator with injected registry, factory and store.
pub struct SyncEngine {
    registry: Arc<ConnectionRegistry>,
    factory: Arc<dyn ConnectorFactory>,
    store: Arc<dyn KeyValueStore>,
    logs: Arc<SyncLogBuffer>,
    config: Mutex<AutoSyncConfig>,
}

impl SyncEngine {
    /// Build the engine, loading the persisted auto-sync configuration.
    /// Corrupt persisted config falls back to defaults.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        factory: Arc<dyn ConnectorFactory>,
        store: Arc<dyn KeyValueStore>,
        logs: Arc<SyncLogBuffer>,
    ) -> Self {
        let config = store
            .get(AUTOSYNC_CONFIG_KEY)
            .and_then(|raw| serde_json::from_str::<AutoSyncConfig>(&raw).ok())
            .unwrap_or_default();

        Self {
            registry,
            factory,
            store,
            logs,
            config: Mutex::new(config),
        }
    }

    /// Current auto-sync configuration.
    pub fn config(&self) -> AutoSyncConfig {
        self.config.lock().unwrap().clone()
    }

    /// Merge a patch into the auto-sync configuration, persisting immediately.
    pub fn update_config(&self, patch: &AutoSyncConfigPatch) -> AutoSyncConfig {
        let updated = {
            let mut config = self.config.lock().unwrap();
            config.apply(patch);
            config.clone()
        };
        self.persist_config(&updated);
        self.logs.append(
            LogLevel::Info,
            "Auto-sync configuration updated",
            Some(BTreeMap::from([(
                "config".to_string(),
                serde_json::to_value(&updated).unwrap_or_default(),
            )])),
            None,
        );
        updated
    }

    /// Restore documented default values, persisting immediately.
    pub fn reset_config(&self) -> AutoSyncConfig {
        let defaults = AutoSyncConfig::default();
        *self.config.lock().unwrap() = defaults.clone();
        self.persist_config(&defaults);
        self.logs.append(
            LogLevel::Info,
            "Auto-sync configuration reset to defaults",
            None,
            None,
        );
        defaults
    }

    fn persist_config(&self, config: &AutoSyncConfig) {
        match serde_json::to_string(config) {
            Ok(raw) => {
                if let Err(err) = self.store.set(AUTOSYNC_CONFIG_KEY, &raw) {
                    warn!(error = %err, "Failed to persist auto-sync config");
                }
            }
            Err(err) => warn!(error = %err, "Failed to serialize auto-sync config"),
        }
    }

    /// Recent audit log entries, newest first.
    pub fn recent_logs(&self, limit: usize) -> Vec<crate::models::SyncLogEntry> {
        self.logs.recent(limit)
    }

    /// Entry point for campaign generation events.
    ///
    /// Disabled auto-sync and a missing CRM connection are both deliberate
    /// no-ops, not errors: campaigns stay usable without CRM configured.
    pub async fn handle_automatic_sync(
        &self,
        campaign_result: &CampaignResult,
        product_description: &str,
        settings: &CampaignSettings,
        metadata: Option<serde_json::Value>,
    ) -> SyncOutcome {
        let config = self.config();
        if !config.enabled || !config.sync_on_generation {
            debug!("Auto-sync disabled, skipping CRM sync");
            self.logs.append(
                LogLevel::Info,
                "Auto-sync disabled, generation event skipped",
                None,
                None,
            );
            return SyncOutcome::skipped();
        }

        let Some(connection) = self.registry.active_connection() else {
            self.logs.append(
                LogLevel::Info,
                "No active CRM connection, generation event not synced",
                None,
                None,
            );
            return SyncOutcome::warning("No active CRM connection configured");
        };

        let session_id = metadata
            .as_ref()
            .and_then(|m| m.get("session_id"))
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let payload = SyncPayload {
            campaign_result: campaign_result.clone(),
            product_description: product_description.to_string(),
            settings: settings.clone(),
            session_id,
            metadata,
        };

        self.perform_sync_with_retry(&connection, &payload, &config)
            .await
    }

    /// Force one sync run even when generation-triggered sync is off.
    ///
    /// The prior `sync_on_generation` value is restored afterwards whatever
    /// the sync does; configuration is not permanently altered.
    pub async fn trigger_manual_sync(
        &self,
        campaign_result: &CampaignResult,
        product_description: &str,
        settings: &CampaignSettings,
        metadata: Option<serde_json::Value>,
    ) -> SyncOutcome {
        let prior = {
            let mut config = self.config.lock().unwrap();
            std::mem::replace(&mut config.sync_on_generation, true)
        };
        let _restore = scopeguard::guard((), |_| {
            self.config.lock().unwrap().sync_on_generation = prior;
        });

        self.logs
            .append(LogLevel::Info, "Manual sync triggered", None, None);
        self.handle_automatic_sync(campaign_result, product_description, settings, metadata)
            .await
    }

    /// Run the core sync up to `retry_attempts + 1` times with linear
    /// backoff: the delay after failed attempt `i` is
    /// `retry_delay_ms * (i + 1)`.
    pub async fn perform_sync_with_retry(
        &self,
        connection: &Connection,
        payload: &SyncPayload,
        config: &AutoSyncConfig,
    ) -> SyncOutcome {
        let max_attempts = config.retry_attempts + 1;
        let metric_labels = vec![("provider", connection.provider.slug().to_string())];
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            counter!("crm_sync_attempts_total", &metric_labels).increment(1);
            let attempt_result = self.perform_sync(connection, payload, config).await;

            match attempt_result {
                Ok(mut outcome) if outcome.success => {
                    outcome.retry_attempts = attempt;
                    histogram!("crm_sync_duration_ms", &metric_labels)
                        .record(outcome.duration_ms as f64);
                    self.registry.update_connection(
                        &connection.id,
                        ConnectionPatch {
                            last_sync: Some(Utc::now()),
                            status: Some(ConnectionStatus::Connected),
                            error_message: Some(None),
                            ..Default::default()
                        },
                    );
                    self.logs.append(
                        LogLevel::Info,
                        "CRM sync completed",
                        Some(BTreeMap::from([
                            ("session_id".to_string(), json!(payload.session_id)),
                            ("attempt".to_string(), json!(attempt)),
                            ("records_created".to_string(), json!(outcome.records_created)),
                            ("errors".to_string(), json!(outcome.errors.len())),
                        ])),
                        None,
                    );
                    info!(
                        connection_id = %connection.id,
                        session_id = %payload.session_id,
                        attempt,
                        records_created = outcome.records_created,
                        "CRM sync completed"
                    );
                    return outcome;
                }
                Ok(outcome) => {
                    last_error = outcome
                        .errors
                        .last()
                        .map(|e| e.message.clone())
                        .unwrap_or_else(|| "sync reported failure".to_string());
                }
                Err(err) => {
                    last_error = err.to_string();
                }
            }

            warn!(
                connection_id = %connection.id,
                session_id = %payload.session_id,
                attempt,
                error = %last_error,
                "CRM sync attempt failed"
            );

            if attempt + 1 < max_attempts {
                let delay = config.retry_delay_ms * (attempt as u64 + 1);
                debug!(delay_ms = delay, "Backing off before next sync attempt");
                sleep(Duration::from_millis(delay)).await;
            }
        }

        counter!("crm_sync_failures_total", &metric_labels).increment(1);
        self.registry.update_connection(
            &connection.id,
            ConnectionPatch {
                status: Some(ConnectionStatus::Error),
                error_message: Some(Some(last_error.clone())),
                ..Default::default()
            },
        );
        self.logs.append(
            LogLevel::Error,
            "CRM sync failed after exhausting retries",
            Some(BTreeMap::from([
                ("session_id".to_string(), json!(payload.session_id)),
                ("attempts".to_string(), json!(max_attempts)),
            ])),
            Some(last_error.clone()),
        );
        error!(
            connection_id = %connection.id,
            session_id = %payload.session_id,
            attempts = max_attempts,
            error = %last_error,
            "CRM sync failed after exhausting retries"
        );

        SyncOutcome {
            success: false,
            errors: vec![SyncRecordError::retryable(None, last_error)],
            retry_attempts: config.retry_attempts,
            ..Default::default()
        }
    }

    /// One sync attempt, dispatched on the connection's provider tag.
    ///
    /// Vendors without a built integration report success with a warning so
    /// that configuring them is a non-fatal no-op rather than an error.
    async fn perform_sync(
        &self,
        connection: &Connection,
        payload: &SyncPayload,
        config: &AutoSyncConfig,
    ) -> Result<SyncOutcome, SyncAttemptError> {
        match connection.provider {
            CrmProvider::Airtable => self.sync_to_airtable(connection, payload, config).await,
            CrmProvider::Salesforce | CrmProvider::Hubspot => {
                let message = format!(
                    "{} sync not yet implemented",
                    connection.provider.display_name()
                );
                self.logs
                    .append(LogLevel::Warn, message.clone(), None, None);
                Ok(SyncOutcome::warning(message))
            }
        }
    }

    /// The Airtable write sequence: anchor campaign record first, then
    /// batched content assets, then competitor analyses.
    async fn sync_to_airtable(
        &self,
        connection: &Connection,
        payload: &SyncPayload,
        config: &AutoSyncConfig,
    ) -> Result<SyncOutcome, SyncAttemptError> {
        let started = std::time::Instant::now();
        let connector = self.factory.connector_for(connection)?;
        let mut outcome = SyncOutcome::default();

        // Anchor record: everything else references it, so failure here
        // aborts the attempt.
        let record = build_campaign_record(payload);
        let campaign_id = connector.create_campaign(&record).await?;
        outcome.records_processed += 1;
        outcome.records_created += 1;
        outcome.campaign_record_id = Some(campaign_id.clone());
        debug!(campaign_id = %campaign_id, "Created campaign anchor record");

        if config.include_content_assets {
            let assets = derive_content_assets(&payload.campaign_result, &campaign_id);
            let batch_size = config.batch_size.max(1);
            let batch_count = assets.len().div_ceil(batch_size);

            for (index, batch) in assets.chunks(batch_size).enumerate() {
                for asset in batch {
                    outcome.records_processed += 1;
                    match connector.create_content_asset(asset).await {
                        Ok(id) => {
                            outcome.records_created += 1;
                            outcome.content_asset_ids.push(id);
                        }
                        Err(err) => {
                            outcome.errors.push(SyncRecordError {
                                record_id: None,
                                message: format!(
                                    "content asset ({}): {}",
                                    asset.content_type.slug(),
                                    err
                                ),
                                retryable: err.is_retryable(),
                            });
                        }
                    }
                }
                // Short pause between batches to stay under vendor rate limits
                if index + 1 < batch_count {
                    sleep(Duration::from_millis(BATCH_PAUSE_MS)).await;
                }
            }
        }

        if config.include_competitor_analysis {
            let analyses = payload
                .campaign_result
                .competitor_analysis
                .as_deref()
                .unwrap_or_default();
            for analysis in analyses {
                outcome.records_processed += 1;
                let record = CompetitorAnalysisRecord {
                    campaign_id: campaign_id.clone(),
                    competitor_name: analysis.competitor_name.clone(),
                    strengths: analysis.strengths.clone(),
                    weaknesses: analysis.weaknesses.clone(),
                    strategy: analysis.strategy.clone(),
                    examples: analysis.examples.clone(),
                    analyzed_at: Utc::now(),
                };
                match connector.create_competitor_analysis(&record).await {
                    Ok(id) => {
                        outcome.records_created += 1;
                        outcome.competitor_analysis_ids.push(id);
                    }
                    Err(err) => {
                        outcome.errors.push(SyncRecordError {
                            record_id: None,
                            message: format!(
                                "competitor analysis ({}): {}",
                                analysis.competitor_name, err
                            ),
                            retryable: err.is_retryable(),
                        });
                    }
                }
            }
        }

        // Partial success policy: the anchor record is the prerequisite for
        // all value, so child failures land in `errors` without flipping the
        // overall outcome.
        outcome.success = true;
        outcome.duration_ms = started.elapsed().as_millis() as u64;
        Ok(outcome)
    }

    /// Read-only diagnostic summary for operational tooling.
    pub fn health_check(&self) -> HealthReport {
        let config = self.config();
        let config_valid =
            config.retry_attempts > 0 && config.retry_delay_ms > 0 && config.batch_size > 0;
        let connection_available = self.registry.active_connection().is_some();
        let recent_errors = self.logs.has_recent_errors(20);

        let mut recommendations = Vec::new();
        if !config_valid {
            recommendations
                .push("Retry attempts, retry delay and batch size should all be positive".into());
        }
        if !connection_available {
            recommendations
                .push("Configure and activate a CRM connection to enable automatic sync".into());
        }
        if recent_errors {
            recommendations.push("Recent sync errors detected; inspect the sync logs".into());
        }
        if !config.enabled {
            recommendations.push("Auto-sync is disabled; generated campaigns are not synced".into());
        }

        HealthReport {
            config_valid,
            connection_available,
            recent_errors,
            recommendations,
        }
    }
}

/// Map the sync payload onto the anchor campaign record.
fn build_campaign_record(payload: &SyncPayload) -> CampaignRecord {
    let now = Utc::now();
    let company = if payload.settings.company_name.is_empty() {
        "Zenith"
    } else {
        &payload.settings.company_name
    };
    let campaign_type = if payload.settings.campaign_type.is_empty() {
        "marketing".to_string()
    } else {
        payload.settings.campaign_type.clone()
    };

    CampaignRecord {
        name: format!("{} - {}", company, now.format("%Y-%m-%d %H:%M")),
        campaign_type,
        status: "generated".to_string(),
        product_description: payload.product_description.clone(),
        target_audience: payload.campaign_result.target_audience.clone(),
        key_messaging: payload.campaign_result.key_messaging.clone(),
        company_name: payload.settings.company_name.clone(),
        company_website: payload.settings.company_website.clone(),
        language: payload.settings.language.clone(),
        generated_at: now,
        metadata: json!({
            "session_id": payload.session_id,
            "settings": payload.settings,
            "extra": payload.metadata,
        }),
    }
}

/// Derive the content-asset list from a campaign result.
///
/// One record per social post and per ad-copy unit, one aggregate each for
/// SEO keywords and backlink strategy when non-empty, one for the meta
/// title/description when present, and one per AI image prompt.
pub fn derive_content_assets(
    result: &CampaignResult,
    campaign_id: &str,
) -> Vec<ContentAssetRecord> {
    let now = Utc::now();
    let mut assets = Vec::new();

    for post in &result.social_media_content {
        assets.push(ContentAssetRecord {
            campaign_id: campaign_id.to_string(),
            content_type: ContentAssetType::SocialMedia,
            platform: Some(post.platform.clone()),
            content: post.content.clone(),
            metadata: json!({}),
            created_at: now,
        });
    }

    for ad in &result.ad_copy {
        assets.push(ContentAssetRecord {
            campaign_id: campaign_id.to_string(),
            content_type: ContentAssetType::AdCopy,
            platform: None,
            content: format!("{}\n\n{}", ad.headline, ad.body),
            metadata: json!({ "headline": ad.headline }),
            created_at: now,
        });
    }

    if !result.seo_keywords.is_empty() {
        assets.push(ContentAssetRecord {
            campaign_id: campaign_id.to_string(),
            content_type: ContentAssetType::SeoKeywords,
            platform: None,
            content: result.seo_keywords.join(", "),
            metadata: json!({ "keyword_count": result.seo_keywords.len() }),
            created_at: now,
        });
    }

    if !result.backlink_strategy.is_empty() {
        assets.push(ContentAssetRecord {
            campaign_id: campaign_id.to_string(),
            content_type: ContentAssetType::BacklinkStrategy,
            platform: None,
            content: result.backlink_strategy.join("\n"),
            metadata: json!({}),
            created_at: now,
        });
    }

    if let Some(meta) = &result.meta_data {
        assets.push(ContentAssetRecord {
            campaign_id: campaign_id.to_string(),
            content_type: ContentAssetType::MetaData,
            platform: None,
            content: format!("Title: {}\nDescription: {}", meta.title, meta.description),
            metadata: json!({}),
            created_at: now,
        });
    }

    if let Some(prompts) = &result.ai_image_prompts {
        for prompt in prompts {
            assets.push(ContentAssetRecord {
                campaign_id: campaign_id.to_string(),
                content_type: ContentAssetType::AiPrompt,
                platform: None,
                content: prompt.clone(),
                metadata: json!({}),
                created_at: now,
            });
        }
    }

    assets
}
