//! Response types for aggregated searches.

use crate::model::CanonicalTenderRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-request, per-source result status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOutcome {
    /// Records this source contributed (before dedup).
    pub records: usize,

    /// `false` when the source could not be attempted at all (disabled,
    /// credential not configured); `true` otherwise, including for calls
    /// that were attempted and failed.
    pub available: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Time the source call took, where one was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl SourceOutcome {
    pub fn ok(records: usize, duration_ms: u64) -> Self {
        Self {
            records,
            available: true,
            error: None,
            duration_ms: Some(duration_ms),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            records: 0,
            available: false,
            error: Some(reason.into()),
            duration_ms: None,
        }
    }

    pub fn failed(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            records: 0,
            available: true,
            error: Some(error.into()),
            duration_ms: Some(duration_ms),
        }
    }

    pub fn is_success(&self) -> bool {
        self.available && self.error.is_none()
    }
}

/// The merged, deduplicated, ranked and paginated response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// The requested page of records.
    pub records: Vec<CanonicalTenderRecord>,

    /// Deduplicated set size before pagination, for page-count math.
    pub total: usize,

    /// Source id -> outcome for every requested source.
    pub sources: HashMap<String, SourceOutcome>,

    /// Wall-clock time for the whole operation.
    pub duration_ms: u64,
}

impl AggregatedResult {
    /// Sources that were queried successfully.
    pub fn contributing_sources(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self
            .sources
            .iter()
            .filter(|(_, outcome)| outcome.is_success())
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Sources that failed or were unavailable.
    pub fn failed_sources(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self
            .sources
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// True when every requested source failed or was unavailable. The
    /// response is still structurally valid; surfacing this as user-facing
    /// degradation is the caller's decision.
    pub fn all_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.values().all(|o| !o.is_success())
    }
}
