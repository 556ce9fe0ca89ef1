// src/lib.rs
pub mod aggregate;
pub mod config;
pub mod credentials;
pub mod error;
pub mod model;
pub mod saved;
pub mod sources;
pub mod utils;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{SourceConfigStore, SourceDescriptor};
use crate::credentials::CredentialStore;
use crate::error::AdapterError;
use crate::model::{CanonicalTenderRecord, SearchQuery};
use crate::sources::catalogue::{CatalogueAdapter, CatalogueBackend, MemoryCatalogue};

pub use crate::aggregate::{AggregatedResult, AggregationEngine, SourceOutcome};
pub use crate::model::{QueryError, TenderStatus, TenderType};

/// One queryable tender source.
///
/// Implementations translate a generic `SearchQuery` into their source's
/// request shape, perform the call and map the response into canonical
/// records. The contract:
///
/// - zero results is a success, not an error
/// - the call must return within `deadline` or fail fast; no internal
///   retries (callers may wrap an adapter with a retry policy)
/// - a required credential that is not configured is reported as
///   `AdapterError::MissingCredential` without attempting the call
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique source identifier, also the record id prefix.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    /// Whether this source needs a configured credential to be queried.
    fn requires_credential(&self) -> bool {
        false
    }

    async fn search(
        &self,
        query: &SearchQuery,
        deadline: Duration,
    ) -> Result<Vec<CanonicalTenderRecord>, AdapterError>;
}

struct RegistryEntry {
    descriptor: SourceDescriptor,
    adapter: Arc<dyn SourceAdapter>,
}

/// Read-only table of known sources.
///
/// Built once at start-up and shared by reference into the engine; no
/// mutation API is exposed at request time, so it needs no locking.
pub struct SourceRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        SourceRegistry {
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, descriptor: SourceDescriptor, adapter: Arc<dyn SourceAdapter>) {
        self.entries.insert(
            descriptor.id.clone(),
            RegistryEntry {
                descriptor,
                adapter,
            },
        );
    }

    pub fn adapter(&self, id: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.entries.get(id).map(|e| Arc::clone(&e.adapter))
    }

    pub fn describe(&self, id: &str) -> Option<&SourceDescriptor> {
        self.entries.get(id).map(|e| &e.descriptor)
    }

    /// Enabled sources, sorted by id for deterministic iteration.
    pub fn list_enabled(&self) -> Vec<&SourceDescriptor> {
        let mut descriptors: Vec<_> = self
            .entries
            .values()
            .map(|e| &e.descriptor)
            .filter(|d| d.enabled)
            .collect();
        descriptors.sort_by(|a, b| a.id.cmp(&b.id));
        descriptors
    }

    /// All known sources, enabled or not, sorted by id.
    pub fn list_all(&self) -> Vec<&SourceDescriptor> {
        let mut descriptors: Vec<_> = self.entries.values().map(|e| &e.descriptor).collect();
        descriptors.sort_by(|a, b| a.id.cmp(&b.id));
        descriptors
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a registry with every shipped source enabled via Cargo features,
/// resolving credentials once from the given store.
///
/// The internal catalogue starts empty; use [`build_registry_with`] to
/// plug the surrounding application's catalogue backend in.
pub fn build_default_registry(credentials: &dyn CredentialStore) -> SourceRegistry {
    build_registry_with(
        SourceConfigStore::new_default().load_descriptors(),
        credentials,
        Arc::new(MemoryCatalogue::new()),
    )
}

/// Build a registry from an explicit descriptor table.
#[allow(unused_variables)]
pub fn build_registry_with(
    descriptors: Vec<SourceDescriptor>,
    credentials: &dyn CredentialStore,
    catalogue: Arc<dyn CatalogueBackend>,
) -> SourceRegistry {
    let mut registry = SourceRegistry::new();

    for descriptor in descriptors {
        match descriptor.id.as_str() {
            #[cfg(feature = "ted")]
            "ted" => {
                if let Ok(adapter) = sources::ted::TedAdapter::new(descriptor.endpoint.clone()) {
                    registry.register(descriptor, Arc::new(adapter));
                }
            }

            #[cfg(feature = "contracts-finder")]
            "contracts_finder" => {
                if let Ok(adapter) = sources::contracts_finder::ContractsFinderAdapter::new(
                    descriptor.endpoint.clone(),
                ) {
                    registry.register(descriptor, Arc::new(adapter));
                }
            }

            #[cfg(feature = "boamp")]
            "boamp" => {
                if let Ok(adapter) = sources::boamp::BoampAdapter::new(descriptor.endpoint.clone())
                {
                    registry.register(descriptor, Arc::new(adapter));
                }
            }

            #[cfg(feature = "sam-gov")]
            "sam_gov" => {
                let api_key = credentials
                    .load(&descriptor.id)
                    .and_then(|c| c.get("api_key").map(|v| v.to_string()));
                if let Ok(adapter) =
                    sources::sam_gov::SamGovAdapter::new(descriptor.endpoint.clone(), api_key)
                {
                    registry.register(descriptor, Arc::new(adapter));
                }
            }

            "catalogue" => {
                let adapter = CatalogueAdapter::new(Arc::clone(&catalogue));
                registry.register(descriptor, Arc::new(adapter));
            }

            other => {
                tracing::debug!("no adapter compiled for source '{}', skipping", other);
            }
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;

    fn test_registry() -> SourceRegistry {
        let credentials = MemoryCredentialStore::new();
        build_registry_with(
            config::builtin_descriptors(),
            &credentials,
            Arc::new(MemoryCatalogue::new()),
        )
    }

    #[test]
    fn test_registry_lookup_and_listing() {
        let registry = test_registry();

        assert!(registry.describe("catalogue").is_some());
        assert!(registry.adapter("catalogue").is_some());
        assert_eq!(registry.adapter("catalogue").unwrap().id(), "catalogue");
        assert!(registry.describe("nope").is_none());

        // Built-ins ship enabled
        assert_eq!(registry.list_enabled().len(), registry.list_all().len());

        // Sorted by id
        let ids: Vec<_> = registry.list_all().iter().map(|d| d.id.clone()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[cfg(feature = "sam-gov")]
    #[test]
    fn test_credentialed_source_registered_without_credential() {
        // The adapter is still registered; it reports unavailable at
        // search time instead of being silently dropped.
        let registry = test_registry();
        assert!(registry.adapter("sam_gov").is_some());
        assert!(registry.describe("sam_gov").unwrap().requires_credential);
    }
}
