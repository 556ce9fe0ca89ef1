//! Adapter for BOAMP, the French public procurement bulletin.
//!
//! BOAMP is published through an opendatasoft portal; the records API
//! takes `q`/`refine.*` query parameters and wraps each notice in
//! `{"recordid": ..., "fields": {...}}`. Field names are French.

use crate::error::AdapterError;
use crate::model::{CanonicalTenderRecord, SearchQuery, TenderStatus, TenderType};
use crate::sources::{fetch_limit, retain_structured_matches};
use crate::utils::{clean_markup, parse_timestamp};
use crate::SourceAdapter;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const SEARCH_PATH: &str = "api/records/1.0/search/";
const DATASET: &str = "boamp";

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<BoampRecord>,
}

#[derive(Debug, Deserialize)]
struct BoampRecord {
    recordid: Option<String>,
    #[serde(default)]
    fields: BoampFields,
}

#[derive(Debug, Default, Deserialize)]
struct BoampFields {
    /// Notice title ("objet du marché")
    objet: Option<String>,
    nomacheteur: Option<String>,
    ville: Option<String>,
    /// Three-letter nature code: FOU, SER or TRA
    nature: Option<String>,
    #[serde(default)]
    descripteur_code: Vec<String>,
    datelimitereponse: Option<String>,
    dateparution: Option<String>,
    montant: Option<f64>,
    url_avis: Option<String>,
    /// "ACTIVE", "ATTRIBUTION" or "CLOTURE"
    etat: Option<String>,
    annonce_lie: Option<String>,
}

pub struct BoampAdapter {
    client: reqwest::Client,
    endpoint: Url,
}

impl BoampAdapter {
    pub fn new(endpoint: Url) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .user_agent("tenderscout/0.3")
            .build()?;
        Ok(BoampAdapter { client, endpoint })
    }

    fn build_url(&self, query: &SearchQuery) -> Result<Url, AdapterError> {
        let mut url = self
            .endpoint
            .join(SEARCH_PATH)
            .map_err(|e| AdapterError::Internal(e.to_string()))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("dataset", DATASET);
            pairs.append_pair("rows", &fetch_limit(query).to_string());

            // Free text and date bounds share the one `q` expression
            let mut q_parts: Vec<String> = Vec::new();
            if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
                q_parts.push(text.trim().to_string());
            }
            if let Some(from) = query.deadline_from {
                q_parts.push(format!("datelimitereponse>={}", from.format("%Y-%m-%d")));
            }
            if let Some(to) = query.deadline_to {
                q_parts.push(format!("datelimitereponse<={}", to.format("%Y-%m-%d")));
            }
            if !q_parts.is_empty() {
                pairs.append_pair("q", &q_parts.join(" AND "));
            }

            for code in &query.cpv_codes {
                pairs.append_pair("refine.descripteur_code", code);
            }
        }

        Ok(url)
    }

    fn map_status(fields: &BoampFields) -> TenderStatus {
        match fields.etat.as_deref() {
            Some("ATTRIBUTION") => TenderStatus::Awarded,
            Some("CLOTURE") => TenderStatus::Closed,
            _ => TenderStatus::Open,
        }
    }

    fn map_record(record: &BoampRecord) -> Option<CanonicalTenderRecord> {
        let id = record.recordid.as_deref()?;
        let fields = &record.fields;
        let title = fields.objet.as_deref().map(clean_markup)?;
        if title.is_empty() {
            return None;
        }

        let tender_type = fields
            .nature
            .as_deref()
            .map(TenderType::from_source_code)
            .unwrap_or(TenderType::Mixed);

        let mut canonical = CanonicalTenderRecord::new("boamp", id, title)
            .with_country("FR")
            .with_cpv_codes(fields.descripteur_code.clone())
            .with_tender_type(tender_type)
            .with_status(Self::map_status(fields));

        if let Some(reference) = fields.annonce_lie.as_deref() {
            canonical = canonical.with_reference(reference);
        }
        if let Some(buyer) = fields.nomacheteur.as_deref() {
            canonical = canonical.with_buyer(clean_markup(buyer));
        }
        if let Some(ville) = fields.ville.as_deref() {
            canonical = canonical.with_location(ville);
        }
        if let Some(montant) = fields.montant {
            canonical = canonical.with_value(montant, "EUR");
        }
        if let Some(deadline) = fields.datelimitereponse.as_deref().and_then(parse_timestamp) {
            canonical = canonical.with_deadline(deadline);
        }
        if let Some(published) = fields.dateparution.as_deref().and_then(parse_timestamp) {
            canonical = canonical.with_published(published);
        }
        if let Some(url) = fields.url_avis.as_deref() {
            canonical = canonical.with_url(url);
        }

        Some(canonical)
    }
}

#[async_trait]
impl SourceAdapter for BoampAdapter {
    fn id(&self) -> &'static str {
        "boamp"
    }

    fn display_name(&self) -> &'static str {
        "BOAMP (FR)"
    }

    async fn search(
        &self,
        query: &SearchQuery,
        deadline: Duration,
    ) -> Result<Vec<CanonicalTenderRecord>, AdapterError> {
        let url = self.build_url(query)?;

        let response = self.client.get(url).timeout(deadline).send().await?;

        if !response.status().is_success() {
            return Err(AdapterError::UpstreamStatus(response.status()));
        }

        let payload: RecordsResponse = response.json().await?;
        let mapped: Vec<_> = payload.records.iter().filter_map(Self::map_record).collect();

        // Nature, value and country filters stay local on this portal
        let records = retain_structured_matches(query, mapped);
        tracing::debug!(count = records.len(), "boamp search mapped");
        Ok(records)
    }
}
