//! The product's own tender catalogue, exposed as just another source.
//!
//! The surrounding application owns the actual store; it plugs in via
//! [`CatalogueBackend`], a local query interface with no HTTP involved.
//! The adapter's job is only to make sure catalogue records obey the
//! same identifier and tagging rules as every remote source.

use crate::error::AdapterError;
use crate::model::{CanonicalTenderRecord, SearchQuery};
use crate::SourceAdapter;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const SOURCE_ID: &str = "catalogue";

/// Query interface the surrounding application implements over its
/// tender store.
#[async_trait]
pub trait CatalogueBackend: Send + Sync {
    async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<CanonicalTenderRecord>, AdapterError>;
}

/// In-memory backend, used as the default and in tests.
#[derive(Default)]
pub struct MemoryCatalogue {
    records: Vec<CanonicalTenderRecord>,
}

impl MemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<CanonicalTenderRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: CanonicalTenderRecord) {
        self.records.push(record);
    }
}

#[async_trait]
impl CatalogueBackend for MemoryCatalogue {
    async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<CanonicalTenderRecord>, AdapterError> {
        Ok(self
            .records
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }
}

pub struct CatalogueAdapter {
    backend: Arc<dyn CatalogueBackend>,
}

impl CatalogueAdapter {
    pub fn new(backend: Arc<dyn CatalogueBackend>) -> Self {
        Self { backend }
    }

    /// Catalogue records may arrive with bare local ids; re-tag them so
    /// the source-prefix identifier invariant holds across sources.
    fn retag(mut record: CanonicalTenderRecord) -> CanonicalTenderRecord {
        if record.source != SOURCE_ID {
            record.source = SOURCE_ID.to_string();
        }
        let prefix = format!("{}_", SOURCE_ID);
        if !record.id.starts_with(&prefix) {
            record.id = format!("{}{}", prefix, record.id);
        }
        record
    }
}

#[async_trait]
impl SourceAdapter for CatalogueAdapter {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn display_name(&self) -> &'static str {
        "Internal catalogue"
    }

    async fn search(
        &self,
        query: &SearchQuery,
        _deadline: Duration,
    ) -> Result<Vec<CanonicalTenderRecord>, AdapterError> {
        let records = self.backend.search(query).await?;
        Ok(records.into_iter().map(Self::retag).collect())
    }
}
