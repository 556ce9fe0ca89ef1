//! Aggregated search execution engine.
//!
//! Fans the query out to every requested source concurrently, collects
//! per-source outcomes without letting one failure abort the rest, then
//! merges, ranks and paginates.

use super::{dedup, rank, AggregatedResult, SourceOutcome};
use crate::error::AdapterError;
use crate::model::{CanonicalTenderRecord, QueryError, SearchQuery};
use crate::{SourceAdapter, SourceRegistry};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine for executing aggregated searches across the registry.
pub struct AggregationEngine<'a> {
    registry: &'a SourceRegistry,
}

enum FanOut {
    Completed(Vec<CanonicalTenderRecord>, u64),
    Failed(AdapterError, u64),
    TimedOut(Duration),
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

impl<'a> AggregationEngine<'a> {
    /// Create a new engine over a registry built at start-up.
    pub fn new(registry: &'a SourceRegistry) -> Self {
        Self { registry }
    }

    /// Single entry point: validate, fan out, merge, rank, paginate.
    ///
    /// Fails only on a query-invariant violation; any number of source
    /// failures still produces a successful `AggregatedResult` with those
    /// sources marked in the diagnostics map.
    pub async fn search(&self, query: &SearchQuery) -> Result<AggregatedResult, QueryError> {
        self.search_with_deadline(query, None).await
    }

    /// Like [`search`](Self::search), with an overall wall-clock budget.
    ///
    /// When the budget elapses, still-running source calls are cancelled
    /// cooperatively (their futures are dropped at the next await point)
    /// and recorded as failures; whatever completed in time is returned.
    pub async fn search_with_deadline(
        &self,
        query: &SearchQuery,
        overall: Option<Duration>,
    ) -> Result<AggregatedResult, QueryError> {
        query.validate()?;
        let start = Instant::now();

        let requested: Vec<String> = if query.sources.is_empty() {
            self.registry
                .list_enabled()
                .iter()
                .map(|d| d.id.clone())
                .collect()
        } else {
            query.sources.clone()
        };

        let mut outcomes: HashMap<String, SourceOutcome> = HashMap::new();
        let mut callable: Vec<(String, Arc<dyn SourceAdapter>, Duration)> = Vec::new();

        for id in requested {
            if outcomes.contains_key(&id) || callable.iter().any(|(c, _, _)| *c == id) {
                continue;
            }
            match self.registry.describe(&id) {
                None => {
                    outcomes.insert(id, SourceOutcome::unavailable("unknown source"));
                }
                Some(descriptor) if !descriptor.enabled => {
                    outcomes.insert(id, SourceOutcome::unavailable("source disabled"));
                }
                Some(descriptor) => {
                    let budget = descriptor.call_timeout();
                    match self.registry.adapter(&id) {
                        Some(adapter) => callable.push((id, adapter, budget)),
                        None => {
                            outcomes.insert(id, SourceOutcome::unavailable("no adapter registered"));
                        }
                    }
                }
            }
        }

        // One slot per source, written exactly once when its future
        // resolves; sources never touch each other's results.
        let mut in_flight: FuturesUnordered<_> = callable
            .iter()
            .map(|(id, adapter, budget)| {
                let id = id.clone();
                let adapter = Arc::clone(adapter);
                let budget = *budget;
                async move {
                    let started = Instant::now();
                    match tokio::time::timeout(budget, adapter.search(query, budget)).await {
                        Ok(Ok(records)) => (id, FanOut::Completed(records, elapsed_ms(started))),
                        Ok(Err(error)) => (id, FanOut::Failed(error, elapsed_ms(started))),
                        Err(_) => (id, FanOut::TimedOut(budget)),
                    }
                }
            })
            .collect();

        let overall_deadline = overall.map(|d| tokio::time::Instant::now() + d);
        let mut collected: Vec<CanonicalTenderRecord> = Vec::new();

        loop {
            let next = match overall_deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, in_flight.next()).await {
                        Ok(next) => next,
                        // Overall budget elapsed: stop waiting, cancel the rest
                        Err(_) => break,
                    }
                }
                None => in_flight.next().await,
            };

            let (id, status) = match next {
                Some(resolved) => resolved,
                None => break,
            };

            match status {
                FanOut::Completed(records, ms) => {
                    tracing::debug!(source = %id, count = records.len(), "source completed");
                    outcomes.insert(id, SourceOutcome::ok(records.len(), ms));
                    collected.extend(records);
                }
                FanOut::Failed(error, ms) => {
                    tracing::warn!(source = %id, error = %error, code = error.code_str(), "source failed");
                    if error.is_unavailable() {
                        outcomes.insert(id, SourceOutcome::unavailable(error.to_string()));
                    } else {
                        outcomes.insert(id, SourceOutcome::failed(error.to_string(), ms));
                    }
                }
                FanOut::TimedOut(budget) => {
                    tracing::warn!(source = %id, budget_ms = budget.as_millis() as u64, "source timed out");
                    outcomes.insert(
                        id,
                        SourceOutcome::failed(
                            format!("timeout after {}ms", budget.as_millis()),
                            budget.as_millis() as u64,
                        ),
                    );
                }
            }
        }
        drop(in_flight);

        // Sources still pending when the overall deadline hit
        for (id, _, _) in &callable {
            if !outcomes.contains_key(id) {
                outcomes.insert(
                    id.clone(),
                    SourceOutcome::failed("cancelled: overall deadline reached", elapsed_ms(start)),
                );
            }
        }

        let merged = dedup::deduplicate(collected);
        let total = merged.len();
        let mut ranked = merged;
        rank::rank(&mut ranked);
        let records = rank::page(ranked, query.offset, query.limit);

        Ok(AggregatedResult {
            records,
            total,
            sources: outcomes,
            duration_ms: elapsed_ms(start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceDescriptor;
    use async_trait::async_trait;
    use url::Url;

    struct StaticAdapter {
        records: Vec<CanonicalTenderRecord>,
    }

    #[async_trait]
    impl SourceAdapter for StaticAdapter {
        fn id(&self) -> &'static str {
            "static"
        }
        fn display_name(&self) -> &'static str {
            "Static"
        }
        async fn search(
            &self,
            _query: &SearchQuery,
            _deadline: Duration,
        ) -> Result<Vec<CanonicalTenderRecord>, AdapterError> {
            Ok(self.records.clone())
        }
    }

    fn descriptor(id: &str, enabled: bool) -> SourceDescriptor {
        SourceDescriptor::new(id, id, Url::parse("internal://test").unwrap())
            .with_enabled(enabled)
    }

    #[tokio::test]
    async fn test_unknown_source_is_unavailable() {
        let registry = SourceRegistry::new();
        let engine = AggregationEngine::new(&registry);

        let query = SearchQuery::new().with_sources(vec!["nope".to_string()]);
        let result = engine.search(&query).await.unwrap();

        assert_eq!(result.total, 0);
        assert!(!result.sources["nope"].available);
    }

    #[tokio::test]
    async fn test_disabled_source_is_unavailable() {
        let mut registry = SourceRegistry::new();
        registry.register(
            descriptor("static", false),
            Arc::new(StaticAdapter {
                records: vec![CanonicalTenderRecord::new("static", "1", "t")],
            }),
        );
        let engine = AggregationEngine::new(&registry);

        let query = SearchQuery::new().with_sources(vec!["static".to_string()]);
        let result = engine.search(&query).await.unwrap();

        assert_eq!(result.total, 0);
        assert!(!result.sources["static"].available);
        // A disabled source is also excluded from the default source set
        let result = engine.search(&SearchQuery::new()).await.unwrap();
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn test_happy_path_counts_and_timing() {
        let mut registry = SourceRegistry::new();
        registry.register(
            descriptor("static", true),
            Arc::new(StaticAdapter {
                records: vec![
                    CanonicalTenderRecord::new("static", "1", "Road works").with_buyer("A"),
                    CanonicalTenderRecord::new("static", "2", "Catering").with_buyer("B"),
                ],
            }),
        );
        let engine = AggregationEngine::new(&registry);

        let result = engine.search(&SearchQuery::new()).await.unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.records.len(), 2);
        let outcome = &result.sources["static"];
        assert!(outcome.is_success());
        assert_eq!(outcome.records, 2);
        assert!(outcome.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_requested_ids_collapse() {
        let mut registry = SourceRegistry::new();
        registry.register(
            descriptor("static", true),
            Arc::new(StaticAdapter {
                records: vec![CanonicalTenderRecord::new("static", "1", "t")],
            }),
        );
        let engine = AggregationEngine::new(&registry);

        let query =
            SearchQuery::new().with_sources(vec!["static".to_string(), "static".to_string()]);
        let result = engine.search(&query).await.unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.sources.len(), 1);
    }
}
