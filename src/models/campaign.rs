//! Campaign generation payload
//!
//! The upstream generative-AI pipeline produces a [`CampaignResult`]; the
//! sync engine treats it as an opaque input and projects it onto CRM records.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One generated social media post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SocialMediaContent {
    /// Target platform, e.g. "linkedin" or "twitter".
    pub platform: String,
    pub content: String,
}

/// One generated ad copy unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdCopy {
    pub headline: String,
    pub body: String,
}

/// Generated meta title/description pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MetaData {
    pub title: String,
    pub description: String,
}

/// Competitor analysis produced alongside the campaign content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompetitorAnalysis {
    pub competitor_name: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
}

/// Output of one campaign generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CampaignResult {
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub key_messaging: Vec<String>,
    #[serde(default)]
    pub social_media_content: Vec<SocialMediaContent>,
    #[serde(default)]
    pub ad_copy: Vec<AdCopy>,
    #[serde(default)]
    pub seo_keywords: Vec<String>,
    #[serde(default)]
    pub backlink_strategy: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_image_prompts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_analysis: Option<Vec<CompetitorAnalysis>>,
}

/// Campaign generation settings carried through to the CRM record metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CampaignSettings {
    #[serde(default)]
    pub campaign_type: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_website: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for CampaignSettings {
    fn default() -> Self {
        Self {
            campaign_type: String::new(),
            company_name: String::new(),
            company_website: String::new(),
            language: default_language(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}
