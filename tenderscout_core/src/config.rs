//! Static source configuration.
//!
//! The table of known sources is built once at start-up (built-in
//! descriptors merged with an optional override file) and is read-only
//! for the rest of the process lifetime. Enabling or disabling a source
//! is an out-of-band configuration change, never a request-scoped one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default rate-limit budget when a descriptor does not set one.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;

/// Floor for the derived per-call timeout.
pub const MIN_CALL_TIMEOUT_MS: u64 = 2_000;

/// Ceiling for the derived per-call timeout.
pub const MAX_CALL_TIMEOUT_MS: u64 = 15_000;

/// A source is assumed to answer within this many multiples of its
/// request pacing interval.
const TIMEOUT_PACING_FACTOR: u64 = 4;

/// Per-source static configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub display_name: String,
    pub endpoint: Url,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub requires_credential: bool,

    /// Rate-limit budget in requests per minute.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT_PER_MINUTE
}

impl SourceDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, endpoint: Url) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            endpoint,
            enabled: true,
            requires_credential: false,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_credential_required(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Per-call timeout derived from the rate-limit budget.
    ///
    /// A source allowed `r` requests/minute is paced at `60_000 / r` ms;
    /// it gets a few multiples of that interval to answer, clamped so a
    /// generous budget never produces a sub-2s timeout and a tight one
    /// never blocks the join for more than 15s.
    pub fn call_timeout(&self) -> Duration {
        let rate = self.rate_limit_per_minute.max(1) as u64;
        let pacing_ms = 60_000 / rate;
        let timeout_ms = (pacing_ms * TIMEOUT_PACING_FACTOR).clamp(MIN_CALL_TIMEOUT_MS, MAX_CALL_TIMEOUT_MS);
        Duration::from_millis(timeout_ms)
    }
}

/// Built-in descriptors for the shipped sources.
pub fn builtin_descriptors() -> Vec<SourceDescriptor> {
    #[allow(unused_mut)]
    let mut descriptors = Vec::new();

    #[cfg(feature = "ted")]
    descriptors.push(
        SourceDescriptor::new(
            "ted",
            "Tenders Electronic Daily (EU)",
            Url::parse("https://api.ted.europa.eu/").unwrap(),
        )
        .with_rate_limit(60),
    );

    #[cfg(feature = "contracts-finder")]
    descriptors.push(
        SourceDescriptor::new(
            "contracts_finder",
            "Contracts Finder (UK)",
            Url::parse("https://www.contractsfinder.service.gov.uk/").unwrap(),
        )
        .with_rate_limit(30),
    );

    #[cfg(feature = "boamp")]
    descriptors.push(
        SourceDescriptor::new(
            "boamp",
            "BOAMP (FR)",
            Url::parse("https://boamp-datadila.opendatasoft.com/").unwrap(),
        )
        .with_rate_limit(30),
    );

    #[cfg(feature = "sam-gov")]
    descriptors.push(
        SourceDescriptor::new(
            "sam_gov",
            "SAM.gov (US)",
            Url::parse("https://api.sam.gov/").unwrap(),
        )
        .with_credential_required()
        .with_rate_limit(10),
    );

    descriptors.push(
        SourceDescriptor::new(
            "catalogue",
            "Internal catalogue",
            Url::parse("internal://catalogue").unwrap(),
        )
        .with_rate_limit(600),
    );

    descriptors
}

/// Per-source overrides read from the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u32>,
}

/// Errors from source configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("config parse error: {0}")]
    Parse(String),
}

/// Reads source overrides from `~/.config/tenderscout/sources.yaml`.
///
/// The file maps source ids to overrides:
///
/// ```yaml
/// sam_gov:
///   enabled: false
/// ted:
///   rate_limit_per_minute: 120
/// ```
pub struct SourceConfigStore {
    path: PathBuf,
}

impl SourceConfigStore {
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        let path = base.join("tenderscout").join("sources.yaml");
        Self { path }
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load all overrides. A missing file is an empty override set.
    pub fn load_overrides(&self) -> Result<HashMap<String, SourceOverride>, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(ConfigError::Io(e.to_string())),
        }
    }

    /// Built-in descriptors with this store's overrides applied.
    pub fn load_descriptors(&self) -> Vec<SourceDescriptor> {
        let overrides = match self.load_overrides() {
            Ok(overrides) => overrides,
            Err(e) => {
                tracing::warn!("ignoring unreadable source config: {}", e);
                HashMap::new()
            }
        };
        apply_overrides(builtin_descriptors(), &overrides)
    }
}

impl Default for SourceConfigStore {
    fn default() -> Self {
        Self::new_default()
    }
}

fn apply_overrides(
    mut descriptors: Vec<SourceDescriptor>,
    overrides: &HashMap<String, SourceOverride>,
) -> Vec<SourceDescriptor> {
    for descriptor in &mut descriptors {
        if let Some(ov) = overrides.get(&descriptor.id) {
            if let Some(enabled) = ov.enabled {
                descriptor.enabled = enabled;
            }
            if let Some(rate) = ov.rate_limit_per_minute {
                descriptor.rate_limit_per_minute = rate.max(1);
            }
        }
    }
    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_timeout_derivation() {
        let descriptor = SourceDescriptor::new(
            "x",
            "X",
            Url::parse("https://example.org/").unwrap(),
        );

        // 30 req/min -> 2s pacing -> 8s timeout
        assert_eq!(
            descriptor.clone().with_rate_limit(30).call_timeout(),
            Duration::from_secs(8)
        );
        // Generous budgets clamp to the floor
        assert_eq!(
            descriptor.clone().with_rate_limit(600).call_timeout(),
            Duration::from_millis(MIN_CALL_TIMEOUT_MS)
        );
        // Tight budgets clamp to the ceiling
        assert_eq!(
            descriptor.clone().with_rate_limit(2).call_timeout(),
            Duration::from_millis(MAX_CALL_TIMEOUT_MS)
        );
        // Zero never divides
        assert_eq!(
            descriptor.with_rate_limit(0).call_timeout(),
            Duration::from_millis(MAX_CALL_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_builtin_descriptors_unique_ids() {
        let descriptors = builtin_descriptors();
        let mut ids: Vec<_> = descriptors.iter().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), descriptors.len());
    }

    #[test]
    fn test_apply_overrides() {
        let descriptors = vec![
            SourceDescriptor::new("a", "A", Url::parse("https://a.example/").unwrap()),
            SourceDescriptor::new("b", "B", Url::parse("https://b.example/").unwrap()),
        ];

        let mut overrides = HashMap::new();
        overrides.insert(
            "a".to_string(),
            SourceOverride {
                enabled: Some(false),
                rate_limit_per_minute: Some(5),
            },
        );

        let merged = apply_overrides(descriptors, &overrides);
        assert!(!merged[0].enabled);
        assert_eq!(merged[0].rate_limit_per_minute, 5);
        assert!(merged[1].enabled);
    }

    #[test]
    fn test_override_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.yaml");
        std::fs::write(&path, "sam_gov:\n  enabled: false\n").unwrap();

        let store = SourceConfigStore::new(path);
        let overrides = store.load_overrides().unwrap();
        assert_eq!(overrides["sam_gov"].enabled, Some(false));

        // Missing file is fine
        let store = SourceConfigStore::new(dir.path().join("absent.yaml"));
        assert!(store.load_overrides().unwrap().is_empty());
    }
}
