//! Canonical tender model shared by every source adapter.
//!
//! Each adapter maps its source's schema into `CanonicalTenderRecord`;
//! everything downstream of the fan-out (dedup, ranking, the response)
//! only ever sees this shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// What is being procured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderType {
    Supply,
    Service,
    Works,
    /// Combined or unclassifiable procurement. Unrecognized source codes
    /// land here instead of failing the record.
    #[default]
    Mixed,
}

impl TenderType {
    /// Map the three-letter nature codes used by several sources.
    pub fn from_source_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "SUP" | "FOU" => TenderType::Supply,
            "SER" | "SRV" => TenderType::Service,
            "WOR" | "WRK" | "TRA" => TenderType::Works,
            _ => TenderType::Mixed,
        }
    }

    /// Classify by CPV division for sources that carry no nature code.
    ///
    /// CPV divisions 01-44 and 48 cover goods, 45 covers construction,
    /// 49+ cover services.
    pub fn from_cpv(code: &str) -> Self {
        let division: u32 = match code.get(..2).and_then(|d| d.parse().ok()) {
            Some(d) => d,
            None => return TenderType::Mixed,
        };
        match division {
            45 => TenderType::Works,
            1..=44 | 48 => TenderType::Supply,
            49..=98 => TenderType::Service,
            _ => TenderType::Mixed,
        }
    }
}

/// Lifecycle state of a tender listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderStatus {
    #[default]
    Open,
    Closed,
    Awarded,
}

/// A normalized tender record from any source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTenderRecord {
    /// Globally unique identifier, always `"<source>_<source-local-id>"`.
    pub id: String,

    /// Source identifier this record came from (e.g. "ted", "boamp").
    pub source: String,

    /// Source-side reference code (publication number, solicitation
    /// number, ...). May repeat across sources for cross-posted tenders.
    #[serde(default)]
    pub reference: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Contracting authority.
    #[serde(default)]
    pub buyer: String,

    /// Free-text place of performance.
    #[serde(default)]
    pub location: String,

    /// ISO 3166-1 alpha-2 country code where known.
    #[serde(default)]
    pub country: String,

    /// Estimated contract value in the source's currency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Submission deadline. Records without one rank last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,

    /// CPV classification codes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cpv_codes: Vec<String>,

    #[serde(default)]
    pub tender_type: TenderType,

    /// Resolvable link back to the original listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub status: TenderStatus,
}

impl CanonicalTenderRecord {
    /// Create a record with required fields. The identifier is derived
    /// from the source tag and the source-local id, which keeps ids
    /// unique across sources before dedup runs.
    pub fn new(
        source: impl Into<String>,
        local_id: impl AsRef<str>,
        title: impl Into<String>,
    ) -> Self {
        let source = source.into();
        Self {
            id: format!("{}_{}", source, local_id.as_ref()),
            source,
            reference: String::new(),
            title: title.into(),
            description: String::new(),
            buyer: String::new(),
            location: String::new(),
            country: String::new(),
            value: None,
            currency: None,
            deadline: None,
            published: None,
            cpv_codes: Vec::new(),
            tender_type: TenderType::Mixed,
            url: None,
            status: TenderStatus::Open,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_buyer(mut self, buyer: impl Into<String>) -> Self {
        self.buyer = buyer.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn with_value(mut self, value: f64, currency: impl Into<String>) -> Self {
        self.value = Some(value);
        self.currency = Some(currency.into());
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    pub fn with_cpv_codes(mut self, codes: Vec<String>) -> Self {
        self.cpv_codes = codes;
        self
    }

    pub fn with_tender_type(mut self, tender_type: TenderType) -> Self {
        self.tender_type = tender_type;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: TenderStatus) -> Self {
        self.status = status;
        self
    }
}

/// Invariant violations rejected at the facade boundary, before any I/O.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryError {
    #[error("minimum value {min} exceeds maximum value {max}")]
    ValueRange { min: f64, max: f64 },

    #[error("deadline window starts after it ends")]
    DeadlineWindow,
}

/// One logical search request, fanned out to every requested source.
///
/// Owned by the caller and passed by reference into the engine; the
/// engine never retains it past the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query. `None` means "everything matching the filters".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// CPV classification code filters (prefix match).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cpv_codes: Vec<String>,

    /// ISO country code filters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_from: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_to: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tender_types: Vec<TenderType>,

    /// Explicit source ids to query. Empty means "all enabled sources".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Page size applied after dedup and ranking.
    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            cpv_codes: Vec::new(),
            countries: Vec::new(),
            min_value: None,
            max_value: None,
            deadline_from: None,
            deadline_to: None,
            tender_types: Vec::new(),
            sources: Vec::new(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_countries(mut self, countries: Vec<String>) -> Self {
        self.countries = countries;
        self
    }

    pub fn with_cpv_codes(mut self, codes: Vec<String>) -> Self {
        self.cpv_codes = codes;
        self
    }

    pub fn with_value_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn with_deadline_window(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.deadline_from = from;
        self.deadline_to = to;
        self
    }

    pub fn with_tender_types(mut self, types: Vec<TenderType>) -> Self {
        self.tender_types = types;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Reject invariant violations before any adapter is invoked.
    pub fn validate(&self) -> Result<(), QueryError> {
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(QueryError::ValueRange { min, max });
            }
        }
        if let (Some(from), Some(to)) = (self.deadline_from, self.deadline_to) {
            if from > to {
                return Err(QueryError::DeadlineWindow);
            }
        }
        Ok(())
    }

    /// Full local filter predicate, used by sources that cannot push any
    /// filter into their remote query (the internal catalogue).
    pub fn matches(&self, record: &CanonicalTenderRecord) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !needle.is_empty()
                && !record.title.to_lowercase().contains(&needle)
                && !record.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        self.matches_structured(record)
    }

    /// The structured filters only, without the free-text clause.
    ///
    /// Remote sources match free text against fields the canonical
    /// record does not carry, so re-checking text locally would drop
    /// valid results; the structured filters are safe to re-apply to
    /// whatever a source could not express in its own query.
    pub fn matches_structured(&self, record: &CanonicalTenderRecord) -> bool {
        // Every filter only excludes records that carry the field; a
        // record without a country, CPV code, value or deadline is not
        // penalized for its source's thinner schema.
        if !self.countries.is_empty()
            && !record.country.is_empty()
            && !self
                .countries
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&record.country))
        {
            return false;
        }

        if !self.tender_types.is_empty() && !self.tender_types.contains(&record.tender_type) {
            return false;
        }

        if !self.cpv_codes.is_empty()
            && !record.cpv_codes.is_empty()
            && !self.cpv_codes.iter().any(|wanted| {
                record
                    .cpv_codes
                    .iter()
                    .any(|code| code.starts_with(wanted.as_str()))
            })
        {
            return false;
        }

        if let (Some(min), Some(value)) = (self.min_value, record.value) {
            if value < min {
                return false;
            }
        }
        if let (Some(max), Some(value)) = (self.max_value, record.value) {
            if value > max {
                return false;
            }
        }
        if let (Some(from), Some(deadline)) = (self.deadline_from, record.deadline) {
            if deadline < from {
                return false;
            }
        }
        if let (Some(to), Some(deadline)) = (self.deadline_to, record.deadline) {
            if deadline > to {
                return false;
            }
        }

        true
    }
}
