//! Airtable connector implementation
//!
//! Full implementation of the [`CrmConnector`] capability surface over the
//! Airtable REST API. One connector instance is bound to one base and uses
//! its API key as a bearer token. Entity records live in four named tables
//! (Campaigns, Contacts, Companies, Deals); derived campaign content lands in
//! the Content Assets and Competitor Analysis tables.
//!
//! Connectors never retry internally; HTTP failures surface as
//! [`ConnectorError`] values carrying status and body text.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;

use crate::connectors::trait_::{
    BatchOperation, ConnectorError, CrmCompany, CrmConnector, CrmContact, CrmDeal, CrmObjectType,
    CrmRecord, CustomFieldDescriptor,
};
use crate::models::{
    CampaignRecord, CompetitorAnalysisRecord, ContentAssetRecord, CrmProvider,
    SyncOutcome, SyncRecordError,
};

pub const DEFAULT_API_BASE: &str = "https://api.airtable.com/v0";

const CONTENT_ASSETS_TABLE: &str = "Content Assets";
const COMPETITOR_ANALYSIS_TABLE: &str = "Competitor Analysis";

/// Standard contact fields; anything else in an Airtable contact row is
/// passed through as a custom field.
const STANDARD_CONTACT_FIELDS: &[&str] = &["Name", "Email", "Phone", "Company"];

/// Airtable connector bound to one base.
#[derive(Debug)]
pub struct AirtableConnector {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    base_id: String,
}

impl AirtableConnector {
    pub fn new(api_key: String, base_id: String) -> Self {
        Self::with_api_base(api_key, base_id, DEFAULT_API_BASE.to_string())
    }

    /// Construct against a non-default API base (used by tests to point the
    /// connector at a mock server).
    pub fn with_api_base(api_key: String, base_id: String, api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            base_id,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.api_base, self.base_id, urlencode(table))
    }

    fn record_url(&self, table: &str, record_id: &str) -> String {
        format!("{}/{}", self.table_url(table), record_id)
    }

    /// Map a reqwest transport error to a structured connector error.
    fn transport_error(err: reqwest::Error) -> ConnectorError {
        ConnectorError::Network {
            details: err.to_string(),
            retryable: err.is_timeout() || err.is_connect() || err.is_request(),
        }
    }

    /// Convert a non-success response into a structured connector error.
    async fn response_error(resp: reqwest::Response) -> ConnectorError {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return ConnectorError::Auth {
                details: format!("Airtable rejected credentials ({}): {}", status, body),
            };
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("Retry-After")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return ConnectorError::RateLimited { retry_after_secs };
        }
        let body = resp.text().await.unwrap_or_default();
        ConnectorError::Http {
            status: status.as_u16(),
            body,
        }
    }

    /// POST a record into a table, returning the Airtable record id.
    async fn create_record(&self, table: &str, fields: Value) -> Result<String, ConnectorError> {
        let resp = self
            .client
            .post(self.table_url(table))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !resp.status().is_success() {
            return Err(Self::response_error(resp).await);
        }

        let body: Value = resp.json().await.map_err(Self::transport_error)?;
        let id = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConnectorError::Http {
                status: 200,
                body: "Airtable response missing record id".to_string(),
            })?
            .to_string();

        debug!(table, record_id = %id, "Created Airtable record");
        Ok(id)
    }

    async fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: Value,
    ) -> Result<(), ConnectorError> {
        let resp = self
            .client
            .patch(self.record_url(table, record_id))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !resp.status().is_success() {
            return Err(Self::response_error(resp).await);
        }
        Ok(())
    }

    async fn get_record(&self, table: &str, record_id: &str) -> Result<Value, ConnectorError> {
        let resp = self
            .client
            .get(self.record_url(table, record_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !resp.status().is_success() {
            return Err(Self::response_error(resp).await);
        }
        resp.json().await.map_err(Self::transport_error)
    }
}

// Table names only ever contain letters and spaces; path-encode the spaces.
fn urlencode(table: &str) -> String {
    table.replace(' ', "%20")
}

fn contact_fields(contact: &CrmContact) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert("Name".into(), json!(contact.name));
    fields.insert("Email".into(), json!(contact.email));
    if let Some(phone) = &contact.phone {
        fields.insert("Phone".into(), json!(phone));
    }
    if let Some(company) = &contact.company {
        fields.insert("Company".into(), json!(company));
    }
    for (key, value) in &contact.custom_fields {
        fields.insert(key.clone(), value.clone());
    }
    Value::Object(fields)
}

fn contact_from_fields(id: &str, fields: &Value) -> CrmContact {
    let get_str =
        |key: &str| -> String { fields.get(key).and_then(|v| v.as_str()).unwrap_or("").into() };
    let custom_fields = fields
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(key, _)| !STANDARD_CONTACT_FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    CrmContact {
        id: Some(id.to_string()),
        name: get_str("Name"),
        email: get_str("Email"),
        phone: fields
            .get("Phone")
            .and_then(|v| v.as_str())
            .map(String::from),
        company: fields
            .get("Company")
            .and_then(|v| v.as_str())
            .map(String::from),
        custom_fields,
    }
}

fn deal_fields(deal: &CrmDeal) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert("Name".into(), json!(deal.name));
    fields.insert("Stage".into(), json!(deal.stage));
    if let Some(amount) = deal.amount {
        fields.insert("Amount".into(), json!(amount));
    }
    if let Some(close_date) = deal.close_date {
        fields.insert("Close Date".into(), json!(close_date.to_rfc3339()));
    }
    for (key, value) in &deal.custom_fields {
        fields.insert(key.clone(), value.clone());
    }
    Value::Object(fields)
}

fn company_fields(company: &CrmCompany) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert("Name".into(), json!(company.name));
    if let Some(website) = &company.website {
        fields.insert("Website".into(), json!(website));
    }
    if let Some(industry) = &company.industry {
        fields.insert("Industry".into(), json!(industry));
    }
    for (key, value) in &company.custom_fields {
        fields.insert(key.clone(), value.clone());
    }
    Value::Object(fields)
}

fn campaign_fields(campaign: &CampaignRecord) -> Value {
    json!({
        "Name": campaign.name,
        "Type": campaign.campaign_type,
        "Status": campaign.status,
        "Product Description": campaign.product_description,
        "Target Audience": campaign.target_audience,
        "Key Messaging": campaign.key_messaging.join("\n"),
        "Company Name": campaign.company_name,
        "Website": campaign.company_website,
        "Language": campaign.language,
        "Generated At": campaign.generated_at.to_rfc3339(),
        "Metadata": campaign.metadata.to_string(),
    })
}

fn asset_fields(asset: &ContentAssetRecord) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert("Campaign ID".into(), json!(asset.campaign_id));
    fields.insert("Type".into(), json!(asset.content_type.slug()));
    fields.insert("Content".into(), json!(asset.content));
    fields.insert("Metadata".into(), json!(asset.metadata.to_string()));
    fields.insert("Created At".into(), json!(asset.created_at.to_rfc3339()));
    if let Some(platform) = &asset.platform {
        fields.insert("Platform".into(), json!(platform));
    }
    Value::Object(fields)
}

fn analysis_fields(analysis: &CompetitorAnalysisRecord) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert("Campaign ID".into(), json!(analysis.campaign_id));
    fields.insert("Competitor".into(), json!(analysis.competitor_name));
    fields.insert("Strengths".into(), json!(analysis.strengths.join("\n")));
    fields.insert("Weaknesses".into(), json!(analysis.weaknesses.join("\n")));
    fields.insert("Strategy".into(), json!(analysis.strategy));
    fields.insert(
        "Analysis Date".into(),
        json!(analysis.analyzed_at.to_rfc3339()),
    );
    if let Some(examples) = &analysis.examples {
        fields.insert("Examples".into(), json!(examples.join("\n")));
    }
    Value::Object(fields)
}

#[async_trait]
impl CrmConnector for AirtableConnector {
    fn provider(&self) -> CrmProvider {
        CrmProvider::Airtable
    }

    async fn authenticate(&self) -> Result<(), ConnectorError> {
        // Airtable uses static bearer tokens; a liveness probe doubles as the
        // authentication check.
        match self.test_connection().await? {
            true => Ok(()),
            false => Err(ConnectorError::Auth {
                details: "Airtable connection test failed".to_string(),
            }),
        }
    }

    async fn refresh_token(&self) -> Result<(), ConnectorError> {
        Err(ConnectorError::not_supported(
            CrmProvider::Airtable,
            "token refresh",
        ))
    }

    async fn test_connection(&self) -> Result<bool, ConnectorError> {
        let url = format!("{}?maxRecords=1", self.table_url("Campaigns"));
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if resp.status().is_success() {
            Ok(true)
        } else {
            Err(Self::response_error(resp).await)
        }
    }

    async fn create_contact(&self, contact: &CrmContact) -> Result<String, ConnectorError> {
        self.create_record("Contacts", contact_fields(contact)).await
    }

    async fn update_contact(&self, id: &str, contact: &CrmContact) -> Result<(), ConnectorError> {
        self.update_record("Contacts", id, contact_fields(contact))
            .await
    }

    async fn get_contact(&self, id: &str) -> Result<CrmContact, ConnectorError> {
        let record = self.get_record("Contacts", id).await?;
        let empty = json!({});
        let fields = record.get("fields").unwrap_or(&empty);
        Ok(contact_from_fields(id, fields))
    }

    async fn search_contacts(&self, query: &str) -> Result<Vec<CrmContact>, ConnectorError> {
        // Case-insensitive substring match over name and email.
        let formula = format!(
            "OR(SEARCH(LOWER(\"{q}\"), LOWER({{Name}})), SEARCH(LOWER(\"{q}\"), LOWER({{Email}})))",
            q = query.replace('"', "")
        );
        let url = reqwest::Url::parse_with_params(
            &self.table_url("Contacts"),
            &[("filterByFormula", formula.as_str())],
        )
        .map_err(|e| ConnectorError::Config {
            details: format!("invalid search URL: {}", e),
        })?;

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !resp.status().is_success() {
            return Err(Self::response_error(resp).await);
        }

        let body: Value = resp.json().await.map_err(Self::transport_error)?;
        let contacts = body
            .get("records")
            .and_then(|v| v.as_array())
            .map(|records| {
                records
                    .iter()
                    .filter_map(|record| {
                        let id = record.get("id").and_then(|v| v.as_str())?;
                        let empty = json!({});
                        let fields = record.get("fields").unwrap_or(&empty);
                        Some(contact_from_fields(id, fields))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(contacts)
    }

    async fn create_deal(&self, deal: &CrmDeal) -> Result<String, ConnectorError> {
        self.create_record("Deals", deal_fields(deal)).await
    }

    async fn update_deal(&self, id: &str, deal: &CrmDeal) -> Result<(), ConnectorError> {
        self.update_record("Deals", id, deal_fields(deal)).await
    }

    async fn get_deal(&self, id: &str) -> Result<CrmDeal, ConnectorError> {
        let record = self.get_record("Deals", id).await?;
        let empty = json!({});
        let fields = record.get("fields").unwrap_or(&empty);
        Ok(CrmDeal {
            id: Some(id.to_string()),
            name: fields
                .get("Name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            amount: fields.get("Amount").and_then(|v| v.as_f64()),
            stage: fields
                .get("Stage")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            close_date: fields
                .get("Close Date")
                .and_then(|v| v.as_str())
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
            custom_fields: BTreeMap::new(),
        })
    }

    async fn create_company(&self, company: &CrmCompany) -> Result<String, ConnectorError> {
        self.create_record("Companies", company_fields(company))
            .await
    }

    async fn update_company(&self, id: &str, company: &CrmCompany) -> Result<(), ConnectorError> {
        self.update_record("Companies", id, company_fields(company))
            .await
    }

    async fn get_company(&self, id: &str) -> Result<CrmCompany, ConnectorError> {
        let record = self.get_record("Companies", id).await?;
        let empty = json!({});
        let fields = record.get("fields").unwrap_or(&empty);
        Ok(CrmCompany {
            id: Some(id.to_string()),
            name: fields
                .get("Name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            website: fields
                .get("Website")
                .and_then(|v| v.as_str())
                .map(String::from),
            industry: fields
                .get("Industry")
                .and_then(|v| v.as_str())
                .map(String::from),
            custom_fields: BTreeMap::new(),
        })
    }

    async fn create_campaign(&self, campaign: &CampaignRecord) -> Result<String, ConnectorError> {
        self.create_record("Campaigns", campaign_fields(campaign))
            .await
    }

    async fn update_campaign(
        &self,
        id: &str,
        campaign: &CampaignRecord,
    ) -> Result<(), ConnectorError> {
        self.update_record("Campaigns", id, campaign_fields(campaign))
            .await
    }

    async fn get_campaign(&self, id: &str) -> Result<CampaignRecord, ConnectorError> {
        let record = self.get_record("Campaigns", id).await?;
        let empty = json!({});
        let fields = record.get("fields").unwrap_or(&empty);
        let get_str = |key: &str| -> String {
            fields.get(key).and_then(|v| v.as_str()).unwrap_or("").into()
        };
        Ok(CampaignRecord {
            name: get_str("Name"),
            campaign_type: get_str("Type"),
            status: get_str("Status"),
            product_description: get_str("Product Description"),
            target_audience: get_str("Target Audience"),
            key_messaging: fields
                .get("Key Messaging")
                .and_then(|v| v.as_str())
                .map(|s| s.lines().map(String::from).collect())
                .unwrap_or_default(),
            company_name: get_str("Company Name"),
            company_website: get_str("Website"),
            language: get_str("Language"),
            generated_at: fields
                .get("Generated At")
                .and_then(|v| v.as_str())
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(chrono::Utc::now),
            metadata: fields
                .get("Metadata")
                .and_then(|v| v.as_str())
                .and_then(|s| serde_json::from_str(s).ok())
                .unwrap_or(Value::Null),
        })
    }

    async fn create_content_asset(
        &self,
        asset: &ContentAssetRecord,
    ) -> Result<String, ConnectorError> {
        self.create_record(CONTENT_ASSETS_TABLE, asset_fields(asset))
            .await
    }

    async fn create_competitor_analysis(
        &self,
        analysis: &CompetitorAnalysisRecord,
    ) -> Result<String, ConnectorError> {
        self.create_record(COMPETITOR_ANALYSIS_TABLE, analysis_fields(analysis))
            .await
    }

    async fn get_custom_fields(
        &self,
        object_type: CrmObjectType,
    ) -> Result<BTreeMap<String, CustomFieldDescriptor>, ConnectorError> {
        // Airtable meta API lists table schemas for the base.
        let url = format!("{}/meta/bases/{}/tables", self.api_base, self.base_id);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !resp.status().is_success() {
            return Err(Self::response_error(resp).await);
        }

        let body: Value = resp.json().await.map_err(Self::transport_error)?;
        let table_name = object_type.table_name();
        let standard: &[&str] = match object_type {
            CrmObjectType::Contact => STANDARD_CONTACT_FIELDS,
            CrmObjectType::Deal => &["Name", "Amount", "Stage", "Close Date"],
            CrmObjectType::Company => &["Name", "Website", "Industry"],
            CrmObjectType::Campaign => &[
                "Name",
                "Type",
                "Status",
                "Product Description",
                "Target Audience",
                "Key Messaging",
                "Company Name",
                "Website",
                "Language",
                "Generated At",
                "Metadata",
            ],
        };

        let mut custom = BTreeMap::new();
        if let Some(tables) = body.get("tables").and_then(|v| v.as_array()) {
            let table = tables
                .iter()
                .find(|t| t.get("name").and_then(|v| v.as_str()) == Some(table_name));
            if let Some(fields) = table
                .and_then(|t| t.get("fields"))
                .and_then(|v| v.as_array())
            {
                for field in fields {
                    let Some(name) = field.get("name").and_then(|v| v.as_str()) else {
                        continue;
                    };
                    if standard.contains(&name) {
                        continue;
                    }
                    custom.insert(
                        name.to_string(),
                        CustomFieldDescriptor {
                            label: name.to_string(),
                            field_type: field
                                .get("type")
                                .and_then(|v| v.as_str())
                                .unwrap_or("unknown")
                                .to_string(),
                            // Airtable fields are never required at the API level
                            required: false,
                        },
                    );
                }
            }
        }
        Ok(custom)
    }

    async fn batch_sync(
        &self,
        records: &[CrmRecord],
        operation: BatchOperation,
    ) -> Result<SyncOutcome, ConnectorError> {
        let started = std::time::Instant::now();
        let mut outcome = SyncOutcome::default();

        for record in records {
            outcome.records_processed += 1;
            let result = match (operation, record) {
                (BatchOperation::Create, CrmRecord::Contact(contact)) => {
                    self.create_contact(contact).await.map(Some)
                }
                (BatchOperation::Create, CrmRecord::Deal(deal)) => {
                    self.create_deal(deal).await.map(Some)
                }
                (BatchOperation::Create, CrmRecord::Company(company)) => {
                    self.create_company(company).await.map(Some)
                }
                (BatchOperation::Create, CrmRecord::Campaign(campaign)) => {
                    self.create_campaign(campaign).await.map(Some)
                }
                (BatchOperation::Update, CrmRecord::Contact(contact)) => {
                    match contact.id.as_deref() {
                        Some(id) => self.update_contact(id, contact).await.map(|_| None),
                        None => Err(ConnectorError::Config {
                            details: "cannot update a contact without an id".to_string(),
                        }),
                    }
                }
                (BatchOperation::Update, CrmRecord::Deal(deal)) => match deal.id.as_deref() {
                    Some(id) => self.update_deal(id, deal).await.map(|_| None),
                    None => Err(ConnectorError::Config {
                        details: "cannot update a deal without an id".to_string(),
                    }),
                },
                (BatchOperation::Update, CrmRecord::Company(company)) => {
                    match company.id.as_deref() {
                        Some(id) => self.update_company(id, company).await.map(|_| None),
                        None => Err(ConnectorError::Config {
                            details: "cannot update a company without an id".to_string(),
                        }),
                    }
                }
                (BatchOperation::Update, CrmRecord::Campaign(_)) => Err(ConnectorError::Config {
                    details: "campaign batch updates require an explicit record id".to_string(),
                }),
            };

            match result {
                Ok(Some(_created_id)) => outcome.records_created += 1,
                Ok(None) => outcome.records_updated += 1,
                Err(err) => {
                    outcome.errors.push(SyncRecordError {
                        record_id: None,
                        message: err.to_string(),
                        retryable: err.is_retryable(),
                    });
                }
            }
        }

        outcome.success = outcome.errors.is_empty();
        outcome.duration_ms = started.elapsed().as_millis() as u64;
        Ok(outcome)
    }
}
