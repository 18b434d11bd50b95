//! CRM-bound record projections
//!
//! These shapes exist only transiently during a sync run; their persisted
//! representation lives entirely in the external CRM. The campaign record is
//! the anchor that all derived content-asset and competitor records reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Anchor record for one generated campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CampaignRecord {
    pub name: String,
    pub campaign_type: String,
    pub status: String,
    pub product_description: String,
    pub target_audience: String,
    pub key_messaging: Vec<String>,
    pub company_name: String,
    pub company_website: String,
    pub language: String,
    pub generated_at: DateTime<Utc>,
    /// Free-form settings snapshot carried along for auditability.
    pub metadata: serde_json::Value,
}

/// Kind tag for a derived content asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentAssetType {
    SocialMedia,
    AdCopy,
    SeoKeywords,
    BacklinkStrategy,
    MetaData,
    AiPrompt,
}

impl ContentAssetType {
    pub fn slug(&self) -> &'static str {
        match self {
            ContentAssetType::SocialMedia => "social_media",
            ContentAssetType::AdCopy => "ad_copy",
            ContentAssetType::SeoKeywords => "seo_keywords",
            ContentAssetType::BacklinkStrategy => "backlink_strategy",
            ContentAssetType::MetaData => "meta_data",
            ContentAssetType::AiPrompt => "ai_prompt",
        }
    }
}

/// One content asset derived from the campaign result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContentAssetRecord {
    /// CRM id of the anchor campaign record.
    pub campaign_id: String,
    pub content_type: ContentAssetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub content: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// One competitor analysis projected for the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompetitorAnalysisRecord {
    /// CRM id of the anchor campaign record.
    pub campaign_id: String,
    pub competitor_name: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
    pub analyzed_at: DateTime<Utc>,
}
