//! Adapter for the UK Contracts Finder notice search API.
//!
//! Contracts Finder takes a JSON `searchCriteria` document and returns
//! notices wrapped in `{"noticeList": [{"item": {...}}]}`. It carries no
//! contract-nature code, so records are classified by CPV division.

use crate::error::AdapterError;
use crate::model::{CanonicalTenderRecord, SearchQuery, TenderStatus, TenderType};
use crate::sources::{fetch_limit, retain_structured_matches};
use crate::utils::{clean_markup, parse_timestamp};
use crate::SourceAdapter;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const SEARCH_PATH: &str = "api/rest/2/search_notices/json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNoticesResponse {
    #[serde(default)]
    notice_list: Vec<NoticeWrapper>,
}

#[derive(Debug, Deserialize)]
struct NoticeWrapper {
    item: Notice,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Notice {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    organisation_name: Option<String>,
    #[serde(default)]
    region_text: Option<String>,
    value_low: Option<f64>,
    value_high: Option<f64>,
    deadline_date: Option<String>,
    published_date: Option<String>,
    #[serde(default)]
    cpv_codes: Vec<String>,
    notice_status: Option<String>,
    notice_identifier: Option<String>,
    #[serde(rename = "noticeURL")]
    notice_url: Option<String>,
}

pub struct ContractsFinderAdapter {
    client: reqwest::Client,
    endpoint: Url,
}

impl ContractsFinderAdapter {
    pub fn new(endpoint: Url) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .user_agent("tenderscout/0.3")
            .build()?;
        Ok(ContractsFinderAdapter { client, endpoint })
    }

    fn build_criteria(query: &SearchQuery) -> Value {
        let mut criteria = serde_json::Map::new();

        if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
            criteria.insert("keyword".to_string(), json!(text.trim()));
        }
        if !query.cpv_codes.is_empty() {
            criteria.insert("cpvCodes".to_string(), json!(query.cpv_codes));
        }
        if let Some(min) = query.min_value {
            criteria.insert("valueFrom".to_string(), json!(min));
        }
        if let Some(max) = query.max_value {
            criteria.insert("valueTo".to_string(), json!(max));
        }
        if let Some(from) = query.deadline_from {
            criteria.insert(
                "deadlineFrom".to_string(),
                json!(from.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(to) = query.deadline_to {
            criteria.insert(
                "deadlineTo".to_string(),
                json!(to.format("%Y-%m-%d").to_string()),
            );
        }

        Value::Object(criteria)
    }

    fn map_status(raw: Option<&str>) -> TenderStatus {
        match raw {
            Some("Open") => TenderStatus::Open,
            Some("Closed") | Some("Withdrawn") => TenderStatus::Closed,
            Some("Awarded") => TenderStatus::Awarded,
            _ => TenderStatus::Open,
        }
    }

    fn map_notice(notice: &Notice) -> Option<CanonicalTenderRecord> {
        let id = notice.id.as_deref()?;
        let title = notice.title.as_deref().map(clean_markup)?;
        if title.is_empty() {
            return None;
        }

        // No nature code on this source; classify by the first CPV code
        let tender_type = notice
            .cpv_codes
            .first()
            .map(|code| TenderType::from_cpv(code))
            .unwrap_or(TenderType::Mixed);

        let mut record = CanonicalTenderRecord::new("contracts_finder", id, title)
            .with_country("GB")
            .with_cpv_codes(notice.cpv_codes.clone())
            .with_tender_type(tender_type)
            .with_status(Self::map_status(notice.notice_status.as_deref()));

        if let Some(reference) = notice.notice_identifier.as_deref() {
            record = record.with_reference(reference);
        }
        if let Some(description) = notice.description.as_deref() {
            record = record.with_description(clean_markup(description));
        }
        if let Some(buyer) = notice.organisation_name.as_deref() {
            record = record.with_buyer(clean_markup(buyer));
        }
        if let Some(region) = notice.region_text.as_deref() {
            record = record.with_location(region);
        }
        // Prefer the upper estimate when the notice carries a band
        if let Some(value) = notice.value_high.or(notice.value_low) {
            record = record.with_value(value, "GBP");
        }
        if let Some(deadline) = notice.deadline_date.as_deref().and_then(parse_timestamp) {
            record = record.with_deadline(deadline);
        }
        if let Some(published) = notice.published_date.as_deref().and_then(parse_timestamp) {
            record = record.with_published(published);
        }
        if let Some(url) = notice.notice_url.as_deref() {
            record = record.with_url(url);
        }

        Some(record)
    }
}

#[async_trait]
impl SourceAdapter for ContractsFinderAdapter {
    fn id(&self) -> &'static str {
        "contracts_finder"
    }

    fn display_name(&self) -> &'static str {
        "Contracts Finder (UK)"
    }

    async fn search(
        &self,
        query: &SearchQuery,
        deadline: Duration,
    ) -> Result<Vec<CanonicalTenderRecord>, AdapterError> {
        let url = self
            .endpoint
            .join(SEARCH_PATH)
            .map_err(|e| AdapterError::Internal(e.to_string()))?;

        let body = json!({
            "searchCriteria": Self::build_criteria(query),
            "size": fetch_limit(query),
        });

        let response = self
            .client
            .post(url)
            .json(&body)
            .timeout(deadline)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::UpstreamStatus(response.status()));
        }

        let payload: SearchNoticesResponse = response.json().await?;
        let mapped: Vec<_> = payload
            .notice_list
            .iter()
            .filter_map(|wrapper| Self::map_notice(&wrapper.item))
            .collect();

        // Type and country filters have no remote equivalent here
        let records = retain_structured_matches(query, mapped);
        tracing::debug!(count = records.len(), "contracts finder search mapped");
        Ok(records)
    }
}
