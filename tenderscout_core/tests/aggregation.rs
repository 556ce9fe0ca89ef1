//! End-to-end tests of the aggregation facade against mock adapters.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use tenderscout_core::aggregate::dedup;
use tenderscout_core::config::SourceDescriptor;
use tenderscout_core::error::AdapterError;
use tenderscout_core::model::{CanonicalTenderRecord, SearchQuery};
use tenderscout_core::{AggregationEngine, QueryError, SourceAdapter, SourceRegistry};

enum Behavior {
    Records(Vec<CanonicalTenderRecord>),
    HttpError,
    MissingCredential,
    Hang,
}

struct MockAdapter {
    id: &'static str,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        self.id
    }

    async fn search(
        &self,
        _query: &SearchQuery,
        _deadline: Duration,
    ) -> Result<Vec<CanonicalTenderRecord>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Records(records) => Ok(records.clone()),
            Behavior::HttpError => Err(AdapterError::UpstreamStatus(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            )),
            Behavior::MissingCredential => Err(AdapterError::MissingCredential("api_key")),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

struct Fixture {
    registry: SourceRegistry,
    calls: Vec<(&'static str, Arc<AtomicUsize>)>,
}

impl Fixture {
    fn new(sources: Vec<(&'static str, bool, Behavior)>) -> Self {
        let mut registry = SourceRegistry::new();
        let mut calls = Vec::new();

        for (id, enabled, behavior) in sources {
            let counter = Arc::new(AtomicUsize::new(0));
            calls.push((id, Arc::clone(&counter)));

            let descriptor =
                SourceDescriptor::new(id, id, Url::parse("internal://mock").unwrap())
                    .with_enabled(enabled)
                    .with_rate_limit(600);
            registry.register(
                descriptor,
                Arc::new(MockAdapter {
                    id,
                    behavior,
                    calls: counter,
                }),
            );
        }

        Fixture { registry, calls }
    }

    fn calls_for(&self, id: &str) -> usize {
        self.calls
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, counter)| counter.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls
            .iter()
            .map(|(_, counter)| counter.load(Ordering::SeqCst))
            .sum()
    }
}

fn record(source: &str, local: &str, title: &str, buyer: &str) -> CanonicalTenderRecord {
    CanonicalTenderRecord::new(source, local, title).with_buyer(buyer)
}

fn deadline(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn value_range_violation_rejected_before_any_adapter_call() {
    let fixture = Fixture::new(vec![(
        "alpha",
        true,
        Behavior::Records(vec![record("alpha", "1", "t", "b")]),
    )]);
    let engine = AggregationEngine::new(&fixture.registry);

    let query = SearchQuery::new().with_value_range(Some(1_000_000.0), Some(10.0));
    let err = engine.search(&query).await.unwrap_err();

    assert!(matches!(err, QueryError::ValueRange { .. }));
    assert_eq!(fixture.total_calls(), 0);
}

#[tokio::test]
async fn deadline_window_violation_rejected_before_any_adapter_call() {
    let fixture = Fixture::new(vec![(
        "alpha",
        true,
        Behavior::Records(vec![record("alpha", "1", "t", "b")]),
    )]);
    let engine = AggregationEngine::new(&fixture.registry);

    let query = SearchQuery::new()
        .with_deadline_window(Some(deadline(2025, 6, 1)), Some(deadline(2025, 1, 1)));
    let err = engine.search(&query).await.unwrap_err();

    assert_eq!(err, QueryError::DeadlineWindow);
    assert_eq!(fixture.total_calls(), 0);
}

#[tokio::test]
async fn one_failing_source_never_suppresses_the_others() {
    // A enabled/healthy, B enabled/HTTP error, C disabled
    let fixture = Fixture::new(vec![
        (
            "alpha",
            true,
            Behavior::Records(vec![
                record("alpha", "1", "Bridge renovation", "City A"),
                record("alpha", "2", "Harbour dredging", "Port B"),
            ]),
        ),
        ("beta", true, Behavior::HttpError),
        (
            "gamma",
            false,
            Behavior::Records(vec![record("gamma", "9", "Should never appear", "X")]),
        ),
    ]);
    let engine = AggregationEngine::new(&fixture.registry);

    let result = engine.search(&SearchQuery::new()).await.unwrap();

    // Only A's records survive
    assert_eq!(result.total, 2);
    assert!(result.records.iter().all(|r| r.source == "alpha"));

    // B was attempted and failed
    let beta = &result.sources["beta"];
    assert!(beta.available);
    assert!(beta.error.as_deref().unwrap().contains("500"));
    assert_eq!(beta.records, 0);

    // C was never attempted
    let gamma = &result.sources["gamma"];
    assert!(!gamma.available);
    assert_eq!(fixture.calls_for("gamma"), 0);

    assert!(!result.all_failed());
}

#[tokio::test]
async fn missing_credential_reports_unavailable_not_failed() {
    let fixture = Fixture::new(vec![
        (
            "alpha",
            true,
            Behavior::Records(vec![record("alpha", "1", "t", "b")]),
        ),
        ("keyed", true, Behavior::MissingCredential),
    ]);
    let engine = AggregationEngine::new(&fixture.registry);

    let result = engine.search(&SearchQuery::new()).await.unwrap();

    let keyed = &result.sources["keyed"];
    assert!(!keyed.available);
    assert!(keyed.error.as_deref().unwrap().contains("credential"));
    assert_eq!(result.total, 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_source_is_contained_and_others_proceed() {
    let fixture = Fixture::new(vec![
        (
            "alpha",
            true,
            Behavior::Records(vec![record("alpha", "1", "t", "b")]),
        ),
        ("slow", true, Behavior::Hang),
    ]);
    let engine = AggregationEngine::new(&fixture.registry);

    let result = engine.search(&SearchQuery::new()).await.unwrap();

    let slow = &result.sources["slow"];
    assert!(slow.available);
    assert!(slow.error.as_deref().unwrap().contains("timeout"));
    assert_eq!(result.total, 1);
    assert_eq!(result.records[0].source, "alpha");
}

#[tokio::test(start_paused = true)]
async fn overall_deadline_cancels_stragglers() {
    let fixture = Fixture::new(vec![
        (
            "alpha",
            true,
            Behavior::Records(vec![record("alpha", "1", "t", "b")]),
        ),
        ("slow", true, Behavior::Hang),
    ]);
    let engine = AggregationEngine::new(&fixture.registry);

    let result = engine
        .search_with_deadline(&SearchQuery::new(), Some(Duration::from_millis(500)))
        .await
        .unwrap();

    // The healthy source finished inside the budget
    assert_eq!(result.total, 1);
    // The straggler is recorded, not waited for
    let slow = &result.sources["slow"];
    assert!(slow.available);
    assert!(slow.error.as_deref().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn cross_source_duplicate_keeps_value_bearing_record() {
    let fixture = Fixture::new(vec![
        (
            "alpha",
            true,
            Behavior::Records(vec![record(
                "alpha",
                "1",
                "School canteen catering",
                "Ville de Nantes",
            )]),
        ),
        (
            "beta",
            true,
            Behavior::Records(vec![record(
                "beta",
                "77",
                "School Canteen Catering!",
                "VILLE DE NANTES",
            )
            .with_value(250_000.0, "EUR")]),
        ),
    ]);
    let engine = AggregationEngine::new(&fixture.registry);

    let result = engine.search(&SearchQuery::new()).await.unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].id, "beta_77");
    assert_eq!(result.records[0].value, Some(250_000.0));

    // Both sources still count their own contribution in diagnostics
    assert_eq!(result.sources["alpha"].records, 1);
    assert_eq!(result.sources["beta"].records, 1);
}

#[tokio::test]
async fn ranking_soonest_deadline_first_nulls_last() {
    let fixture = Fixture::new(vec![(
        "alpha",
        true,
        Behavior::Records(vec![
            record("alpha", "march", "A", "b1").with_deadline(deadline(2025, 3, 1)),
            record("alpha", "none", "B", "b2"),
            record("alpha", "january", "C", "b3").with_deadline(deadline(2025, 1, 15)),
        ]),
    )]);
    let engine = AggregationEngine::new(&fixture.registry);

    let result = engine.search(&SearchQuery::new()).await.unwrap();

    let ids: Vec<_> = result.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["alpha_january", "alpha_march", "alpha_none"]);
}

#[tokio::test]
async fn pagination_slices_ranked_set_and_total_is_invariant() {
    let records: Vec<_> = (1u32..=5)
        .map(|i| {
            record("alpha", &format!("r{}", i), &format!("Tender {}", i), "b")
                .with_deadline(deadline(2025, 2, i))
        })
        .collect();
    let fixture = Fixture::new(vec![("alpha", true, Behavior::Records(records))]);
    let engine = AggregationEngine::new(&fixture.registry);

    let full = engine
        .search(&SearchQuery::new().with_page(0, 100))
        .await
        .unwrap();
    assert_eq!(full.total, 5);
    assert_eq!(full.records.len(), 5);

    let page = engine
        .search(&SearchQuery::new().with_page(1, 2))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].id, full.records[1].id);
    assert_eq!(page.records[1].id, full.records[2].id);

    // Offset past the end: empty page, same total
    let past = engine
        .search(&SearchQuery::new().with_page(10, 2))
        .await
        .unwrap();
    assert_eq!(past.total, 5);
    assert!(past.records.is_empty());
}

#[tokio::test]
async fn deduplication_is_idempotent_on_facade_output() {
    let fixture = Fixture::new(vec![
        (
            "alpha",
            true,
            Behavior::Records(vec![
                record("alpha", "1", "Waste collection", "Comune di Roma"),
                record("alpha", "2", "Street lighting", "Comune di Roma"),
            ]),
        ),
        (
            "beta",
            true,
            Behavior::Records(vec![record(
                "beta",
                "3",
                "Waste Collection",
                "comune di roma",
            )]),
        ),
    ]);
    let engine = AggregationEngine::new(&fixture.registry);

    let result = engine.search(&SearchQuery::new()).await.unwrap();
    assert_eq!(result.total, 2);

    let again = dedup::deduplicate(result.records.clone());
    let ids_before: Vec<_> = result.records.iter().map(|r| r.id.clone()).collect();
    let ids_after: Vec<_> = again.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids_before, ids_after);
}

#[tokio::test]
async fn all_sources_failing_still_returns_a_valid_result() {
    let fixture = Fixture::new(vec![
        ("beta", true, Behavior::HttpError),
        ("keyed", true, Behavior::MissingCredential),
    ]);
    let engine = AggregationEngine::new(&fixture.registry);

    let result = engine.search(&SearchQuery::new()).await.unwrap();

    assert_eq!(result.total, 0);
    assert!(result.records.is_empty());
    assert!(result.all_failed());
    assert_eq!(result.sources.len(), 2);
}

#[tokio::test]
async fn explicit_source_list_restricts_the_fanout() {
    let fixture = Fixture::new(vec![
        (
            "alpha",
            true,
            Behavior::Records(vec![record("alpha", "1", "A", "b")]),
        ),
        (
            "beta",
            true,
            Behavior::Records(vec![record("beta", "2", "B", "b")]),
        ),
    ]);
    let engine = AggregationEngine::new(&fixture.registry);

    let query = SearchQuery::new().with_sources(vec!["alpha".to_string()]);
    let result = engine.search(&query).await.unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(fixture.calls_for("beta"), 0);
    assert!(!result.sources.contains_key("beta"));
}
