//! Aggregated search across every configured tender source.
//!
//! This module provides:
//! - `SourceOutcome` / `AggregatedResult`: per-source diagnostics and the
//!   merged response
//! - `dedup`: best-effort cross-source duplicate merging
//! - `rank`: the fixed deadline ordering and pagination
//! - `AggregationEngine`: the single entry point wiring fan-out, dedup
//!   and ranking into one call
//!
//! # Example
//!
//! ```ignore
//! use tenderscout_core::{build_default_registry, AggregationEngine};
//! use tenderscout_core::model::SearchQuery;
//!
//! let registry = build_default_registry(&credentials);
//! let engine = AggregationEngine::new(&registry);
//! let result = engine.search(&SearchQuery::for_text("road maintenance")).await?;
//! ```

mod engine;
mod types;

pub mod dedup;
pub mod rank;

pub use engine::AggregationEngine;
pub use types::{AggregatedResult, SourceOutcome};
