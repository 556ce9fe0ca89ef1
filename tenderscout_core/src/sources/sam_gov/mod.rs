//! Adapter for the US SAM.gov opportunities API.
//!
//! SAM.gov requires an API key on every call. When no key is configured
//! the adapter reports itself unavailable without touching the network;
//! configuration absence is not a runtime failure.
//!
//! Product/service classification follows the PSC convention: codes
//! starting with a digit are products, letter codes are services, with
//! construction under Y/Z.

use crate::error::AdapterError;
use crate::model::{CanonicalTenderRecord, SearchQuery, TenderStatus, TenderType};
use crate::sources::{fetch_limit, retain_structured_matches};
use crate::utils::{clean_markup, parse_timestamp};
use crate::SourceAdapter;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const SEARCH_PATH: &str = "opportunities/v2/search";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpportunitiesResponse {
    #[serde(default)]
    opportunities_data: Vec<Opportunity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Opportunity {
    notice_id: Option<String>,
    title: Option<String>,
    solicitation_number: Option<String>,
    /// Dot-separated agency path, e.g. "GENERAL SERVICES ADMINISTRATION.PBS.R9"
    full_parent_path_name: Option<String>,
    posted_date: Option<String>,
    #[serde(rename = "responseDeadLine")]
    response_deadline: Option<String>,
    classification_code: Option<String>,
    /// "Solicitation", "Presolicitation", "Award Notice", ...
    r#type: Option<String>,
    /// "Yes" / "No"
    active: Option<String>,
    ui_link: Option<String>,
    place_of_performance: Option<PlaceOfPerformance>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceOfPerformance {
    city: Option<NamedField>,
    state: Option<CodedField>,
    country: Option<CodedField>,
}

#[derive(Debug, Deserialize)]
struct NamedField {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CodedField {
    code: Option<String>,
}

pub struct SamGovAdapter {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl SamGovAdapter {
    pub fn new(endpoint: Url, api_key: Option<String>) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .user_agent("tenderscout/0.3")
            .build()?;
        Ok(SamGovAdapter {
            client,
            endpoint,
            api_key,
        })
    }

    fn build_url(&self, query: &SearchQuery, api_key: &str) -> String {
        let mut url = format!(
            "{}{}?api_key={}&limit={}",
            self.endpoint,
            SEARCH_PATH,
            urlencoding::encode(api_key),
            fetch_limit(query)
        );

        if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
            url.push_str(&format!("&title={}", urlencoding::encode(text.trim())));
        }
        // SAM.gov insists on US-style dates
        if let Some(from) = query.deadline_from {
            url.push_str(&format!("&rdlfrom={}", from.format("%m/%d/%Y")));
        }
        if let Some(to) = query.deadline_to {
            url.push_str(&format!("&rdlto={}", to.format("%m/%d/%Y")));
        }

        url
    }

    /// PSC codes: digits are products, Y/Z construction, other letters
    /// services.
    fn map_psc(code: Option<&str>) -> TenderType {
        let first = match code.and_then(|c| c.chars().next()) {
            Some(c) => c.to_ascii_uppercase(),
            None => return TenderType::Mixed,
        };
        match first {
            '0'..='9' => TenderType::Supply,
            'Y' | 'Z' => TenderType::Works,
            'A'..='X' => TenderType::Service,
            _ => TenderType::Mixed,
        }
    }

    fn map_status(opportunity: &Opportunity) -> TenderStatus {
        if matches!(opportunity.r#type.as_deref(), Some(t) if t.eq_ignore_ascii_case("Award Notice"))
        {
            return TenderStatus::Awarded;
        }
        match opportunity.active.as_deref() {
            Some("No") => TenderStatus::Closed,
            _ => TenderStatus::Open,
        }
    }

    /// The last path segment is the contracting office; the first is the
    /// department. Keep the department for the buyer field.
    fn buyer_from_path(path: &str) -> String {
        path.split('.')
            .next()
            .unwrap_or(path)
            .trim()
            .to_string()
    }

    fn map_opportunity(opportunity: &Opportunity) -> Option<CanonicalTenderRecord> {
        let notice_id = opportunity.notice_id.as_deref()?;
        let title = opportunity.title.as_deref().map(clean_markup)?;
        if title.is_empty() {
            return None;
        }

        let mut record = CanonicalTenderRecord::new("sam_gov", notice_id, title)
            .with_country("US")
            .with_tender_type(Self::map_psc(opportunity.classification_code.as_deref()))
            .with_status(Self::map_status(opportunity));

        if let Some(reference) = opportunity.solicitation_number.as_deref() {
            record = record.with_reference(reference);
        }
        if let Some(path) = opportunity.full_parent_path_name.as_deref() {
            record = record.with_buyer(Self::buyer_from_path(path));
        }
        if let Some(description) = opportunity.description.as_deref() {
            record = record.with_description(clean_markup(description));
        }
        if let Some(place) = &opportunity.place_of_performance {
            let mut parts: Vec<&str> = Vec::new();
            if let Some(city) = place.city.as_ref().and_then(|c| c.name.as_deref()) {
                parts.push(city);
            }
            if let Some(state) = place.state.as_ref().and_then(|s| s.code.as_deref()) {
                parts.push(state);
            }
            if !parts.is_empty() {
                record = record.with_location(parts.join(", "));
            }
            if let Some(country) = place.country.as_ref().and_then(|c| c.code.as_deref()) {
                // SAM reports alpha-3; keep the canonical alpha-2 for the US
                if country == "USA" {
                    record = record.with_country("US");
                } else {
                    record = record.with_country(country);
                }
            }
        }
        if let Some(deadline) = opportunity
            .response_deadline
            .as_deref()
            .and_then(parse_timestamp)
        {
            record = record.with_deadline(deadline);
        }
        if let Some(posted) = opportunity.posted_date.as_deref().and_then(parse_timestamp) {
            record = record.with_published(posted);
        }
        if let Some(link) = opportunity.ui_link.as_deref() {
            record = record.with_url(link);
        }

        Some(record)
    }
}

#[async_trait]
impl SourceAdapter for SamGovAdapter {
    fn id(&self) -> &'static str {
        "sam_gov"
    }

    fn display_name(&self) -> &'static str {
        "SAM.gov (US)"
    }

    fn requires_credential(&self) -> bool {
        true
    }

    async fn search(
        &self,
        query: &SearchQuery,
        deadline: Duration,
    ) -> Result<Vec<CanonicalTenderRecord>, AdapterError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::MissingCredential("api_key"))?;

        let url = self.build_url(query, api_key);

        let response = self.client.get(&url).timeout(deadline).send().await?;

        if !response.status().is_success() {
            return Err(AdapterError::UpstreamStatus(response.status()));
        }

        let payload: OpportunitiesResponse = response.json().await?;
        let mapped: Vec<_> = payload
            .opportunities_data
            .iter()
            .filter_map(Self::map_opportunity)
            .collect();

        // Classification, value and country filters stay local
        let records = retain_structured_matches(query, mapped);
        tracing::debug!(count = records.len(), "sam.gov search mapped");
        Ok(records)
    }
}
