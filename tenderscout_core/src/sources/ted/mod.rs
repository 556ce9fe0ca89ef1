//! Adapter for Tenders Electronic Daily, the EU procurement journal.
//!
//! Queries the public notice search API (`/v3/notices/search`) with an
//! expert-syntax query string assembled from the generic filters. TED
//! returns multilingual field maps; English text is preferred where
//! published.

use crate::error::AdapterError;
use crate::model::{CanonicalTenderRecord, SearchQuery, TenderStatus, TenderType};
use crate::sources::{fetch_limit, retain_structured_matches};
use crate::utils::{clean_markup, parse_timestamp};
use crate::SourceAdapter;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const SEARCH_PATH: &str = "v3/notices/search";
const LISTING_URL: &str = "https://ted.europa.eu/en/notice/-/detail/";

const RESPONSE_FIELDS: &[&str] = &[
    "publication-number",
    "notice-title",
    "buyer-name",
    "buyer-country",
    "place-of-performance",
    "classification-cpv",
    "contract-nature",
    "description-lot",
    "estimated-value-lot",
    "estimated-value-cur-lot",
    "deadline-receipt-tender-date-lot",
    "publication-date",
    "notice-type",
];

type MultilingualText = HashMap<String, String>;
type MultilingualList = HashMap<String, Vec<String>>;

#[derive(Debug, Deserialize)]
struct TedSearchResponse {
    #[serde(default)]
    notices: Vec<TedNotice>,
}

#[derive(Debug, Deserialize)]
struct TedNotice {
    #[serde(rename = "publication-number")]
    publication_number: Option<String>,

    #[serde(rename = "notice-title", default)]
    title: MultilingualText,

    #[serde(rename = "buyer-name", default)]
    buyer_name: MultilingualList,

    #[serde(rename = "buyer-country", default)]
    buyer_country: Vec<String>,

    #[serde(rename = "place-of-performance", default)]
    place_of_performance: Vec<String>,

    #[serde(rename = "classification-cpv", default)]
    cpv: Vec<String>,

    #[serde(rename = "contract-nature", default)]
    contract_nature: Vec<String>,

    #[serde(rename = "description-lot", default)]
    description: MultilingualText,

    #[serde(rename = "estimated-value-lot")]
    estimated_value: Option<f64>,

    #[serde(rename = "estimated-value-cur-lot")]
    currency: Option<String>,

    #[serde(rename = "deadline-receipt-tender-date-lot")]
    deadline: Option<String>,

    #[serde(rename = "publication-date")]
    publication_date: Option<String>,

    #[serde(rename = "notice-type")]
    notice_type: Option<String>,
}

pub struct TedAdapter {
    client: reqwest::Client,
    endpoint: Url,
}

impl TedAdapter {
    pub fn new(endpoint: Url) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .user_agent("tenderscout/0.3")
            .build()?;
        Ok(TedAdapter { client, endpoint })
    }

    /// Assemble a TED expert-syntax query from the generic filters.
    fn build_expert_query(query: &SearchQuery) -> String {
        let mut clauses: Vec<String> = Vec::new();

        if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
            clauses.push(format!("FT~\"{}\"", text.trim().replace('"', " ")));
        }

        if !query.cpv_codes.is_empty() {
            clauses.push(format!(
                "classification-cpv IN ({})",
                query.cpv_codes.join(" ")
            ));
        }

        if !query.countries.is_empty() {
            let codes: Vec<String> = query
                .countries
                .iter()
                .map(|c| c.to_ascii_uppercase())
                .collect();
            clauses.push(format!("place-of-performance IN ({})", codes.join(" ")));
        }

        if !query.tender_types.is_empty() {
            let natures: Vec<&str> = query
                .tender_types
                .iter()
                .filter_map(|t| match t {
                    TenderType::Works => Some("works"),
                    TenderType::Service => Some("services"),
                    TenderType::Supply => Some("supplies"),
                    TenderType::Mixed => None,
                })
                .collect();
            if !natures.is_empty() {
                clauses.push(format!("contract-nature IN ({})", natures.join(" ")));
            }
        }

        if let Some(from) = query.deadline_from {
            clauses.push(format!(
                "deadline-receipt-tender-date-lot >= {}",
                from.format("%Y%m%d")
            ));
        }
        if let Some(to) = query.deadline_to {
            clauses.push(format!(
                "deadline-receipt-tender-date-lot <= {}",
                to.format("%Y%m%d")
            ));
        }

        if clauses.is_empty() {
            // Unfiltered query: anything still open
            "notice-type IN (cn-standard cn-social)".to_string()
        } else {
            clauses.join(" AND ")
        }
    }

    /// English text if published, else the lexically first language so
    /// repeated requests pick the same variant.
    fn pick_text(map: &MultilingualText) -> Option<&str> {
        if let Some(text) = map.get("eng") {
            return Some(text);
        }
        let mut keys: Vec<_> = map.keys().collect();
        keys.sort();
        keys.first().and_then(|k| map.get(*k)).map(|s| s.as_str())
    }

    fn pick_name(map: &MultilingualList) -> Option<&str> {
        if let Some(names) = map.get("eng") {
            return names.first().map(|s| s.as_str());
        }
        let mut keys: Vec<_> = map.keys().collect();
        keys.sort();
        keys.first()
            .and_then(|k| map.get(*k))
            .and_then(|names| names.first())
            .map(|s| s.as_str())
    }

    fn map_nature(nature: &[String]) -> TenderType {
        if nature.len() > 1 {
            return TenderType::Mixed;
        }
        match nature.first().map(|n| n.as_str()) {
            Some("works") => TenderType::Works,
            Some("services") => TenderType::Service,
            Some("supplies") => TenderType::Supply,
            _ => TenderType::Mixed,
        }
    }

    fn map_notice(notice: &TedNotice) -> Option<CanonicalTenderRecord> {
        let publication_number = notice.publication_number.as_deref()?;
        let title = Self::pick_text(&notice.title).map(clean_markup)?;
        if title.is_empty() {
            return None;
        }

        // Award notices are the only status signal TED exposes here
        let status = match notice.notice_type.as_deref() {
            Some(kind) if kind.starts_with("can") => TenderStatus::Awarded,
            _ => TenderStatus::Open,
        };

        let mut record = CanonicalTenderRecord::new("ted", publication_number, title)
            .with_reference(publication_number)
            .with_url(format!("{}{}", LISTING_URL, publication_number))
            .with_cpv_codes(notice.cpv.clone())
            .with_tender_type(Self::map_nature(&notice.contract_nature))
            .with_status(status);

        if let Some(buyer) = Self::pick_name(&notice.buyer_name) {
            record = record.with_buyer(clean_markup(buyer));
        }
        if let Some(country) = notice.buyer_country.first() {
            record = record.with_country(country.clone());
        }
        if !notice.place_of_performance.is_empty() {
            record = record.with_location(notice.place_of_performance.join(", "));
        }
        if let Some(description) = Self::pick_text(&notice.description) {
            record = record.with_description(clean_markup(description));
        }
        if let Some(value) = notice.estimated_value {
            record = record.with_value(
                value,
                notice.currency.clone().unwrap_or_else(|| "EUR".to_string()),
            );
        }
        if let Some(deadline) = notice.deadline.as_deref().and_then(parse_timestamp) {
            record = record.with_deadline(deadline);
        }
        if let Some(published) = notice.publication_date.as_deref().and_then(parse_timestamp) {
            record = record.with_published(published);
        }

        Some(record)
    }
}

#[async_trait]
impl SourceAdapter for TedAdapter {
    fn id(&self) -> &'static str {
        "ted"
    }

    fn display_name(&self) -> &'static str {
        "Tenders Electronic Daily (EU)"
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
            "query": Self::build_expert_query(query),
            "fields": RESPONSE_FIELDS,
            "page": 1,
            "limit": fetch_limit(query),
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

        let payload: TedSearchResponse = response.json().await?;
        let mapped: Vec<_> = payload
            .notices
            .iter()
            .filter_map(Self::map_notice)
            .collect();

        // Value range is not expressible in the expert query
        let records = retain_structured_matches(query, mapped);
        tracing::debug!(count = records.len(), "ted search mapped");
        Ok(records)
    }
}
