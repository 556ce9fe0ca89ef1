//! Source adapters, one per tender publication system.
//!
//! Each adapter owns its source's wire format: request shape, field
//! names, enumeration values and authentication. Nothing source-specific
//! leaks past this module boundary.

// Internal catalogue (always available)
pub mod catalogue;

#[cfg(feature = "boamp")]
pub mod boamp;
#[cfg(feature = "contracts-finder")]
pub mod contracts_finder;
#[cfg(feature = "sam-gov")]
pub mod sam_gov;
#[cfg(feature = "ted")]
pub mod ted;

use crate::model::SearchQuery;

/// Upper bound on rows fetched from any single source per request.
pub(crate) const MAX_FETCH: usize = 100;

/// How many rows a source must return to cover the requested page.
///
/// Pagination is applied after dedup across all sources, so every source
/// fetches up to the end of the requested window (capped at `MAX_FETCH`),
/// not just `limit` rows.
pub(crate) fn fetch_limit(query: &SearchQuery) -> usize {
    query
        .offset
        .saturating_add(query.limit)
        .clamp(query.limit.max(1), MAX_FETCH)
}

/// Re-apply the structured filters a source could not express in its
/// own query (type, value range, country, deadline window). The free
/// text clause is deliberately not re-checked; see
/// [`SearchQuery::matches_structured`].
pub(crate) fn retain_structured_matches(
    query: &SearchQuery,
    records: Vec<crate::model::CanonicalTenderRecord>,
) -> Vec<crate::model::CanonicalTenderRecord> {
    records
        .into_iter()
        .filter(|record| query.matches_structured(record))
        .collect()
}
