//! Configuration schema definitions
//!
//! Every section and field has a default, so an empty `coastwalk.toml` is a
//! valid configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub proximity: ProximitySection,

    #[serde(default)]
    pub collection: CollectionSection,

    #[serde(default)]
    pub overpass: OverpassSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl ConfigSchema {
    /// Reject values that parse but make no sense
    pub fn validate(&self) -> Result<()> {
        if self.store.bucket.trim().is_empty() {
            return Err(Error::invalid_config("store.bucket", "must not be empty"));
        }
        if self.store.timeout_secs == 0 {
            return Err(Error::invalid_config("store.timeout_secs", "must be greater than 0"));
        }
        if self.proximity.sample_budget == 0 {
            return Err(Error::invalid_config(
                "proximity.sample_budget",
                "must be at least 1",
            ));
        }
        if !(self.proximity.early_exit_km >= 0.0) {
            return Err(Error::invalid_config(
                "proximity.early_exit_km",
                "must be a non-negative number",
            ));
        }
        if !(self.collection.threshold_km > 0.0) {
            return Err(Error::invalid_config(
                "collection.threshold_km",
                "must be a positive number",
            ));
        }
        if !matches!(self.logging.format.as_str(), "compact" | "json") {
            return Err(Error::invalid_config(
                "logging.format",
                format!("expected \"compact\" or \"json\", got \"{}\"", self.logging.format),
            ));
        }
        Ok(())
    }
}

/// Geometry store settings. Secrets come from the environment only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// Object storage base URL; unset means "not configured"
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bucket holding processed geometry
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Local directory used by the filesystem store
    #[serde(default = "default_processed_dir")]
    pub processed_dir: String,

    /// Directory holding raw Overpass batches
    #[serde(default = "default_raw_dir")]
    pub raw_dir: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            base_url: None,
            bucket: default_bucket(),
            timeout_secs: default_store_timeout(),
            processed_dir: default_processed_dir(),
            raw_dir: default_raw_dir(),
        }
    }
}

fn default_bucket() -> String {
    "map-data".to_string()
}

fn default_store_timeout() -> u64 {
    30
}

fn default_processed_dir() -> String {
    "processed_data".to_string()
}

fn default_raw_dir() -> String {
    "raw_data".to_string()
}

/// Region resolution cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    /// Entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Process-local capacity
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// Directory for the session tier; unset means the platform cache dir
    #[serde(default)]
    pub session_dir: Option<String>,

    /// Keep a session tier at all
    #[serde(default = "default_true")]
    pub session_enabled: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            memory_capacity: default_memory_capacity(),
            session_dir: None,
            session_enabled: true,
        }
    }
}

fn default_ttl_secs() -> u64 {
    crate::cache::DEFAULT_TTL_SECS
}

fn default_memory_capacity() -> usize {
    crate::cache::DEFAULT_MEMORY_CAPACITY
}

fn default_true() -> bool {
    true
}

/// Coastline distance search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximitySection {
    /// Segments visited before stride sampling kicks in
    #[serde(default = "default_sample_budget")]
    pub sample_budget: usize,

    /// Stop searching once a segment is closer than this
    #[serde(default = "default_one_km")]
    pub early_exit_km: f64,

    /// Region used when a position falls outside every known rectangle
    #[serde(default = "default_home_region")]
    pub home_region: String,
}

impl Default for ProximitySection {
    fn default() -> Self {
        Self {
            sample_budget: default_sample_budget(),
            early_exit_km: default_one_km(),
            home_region: default_home_region(),
        }
    }
}

fn default_sample_budget() -> usize {
    50
}

fn default_one_km() -> f64 {
    1.0
}

fn default_home_region() -> String {
    "JP-13".to_string()
}

/// Collection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSection {
    /// Maximum coastline distance for a collection to count
    #[serde(default = "default_one_km")]
    pub threshold_km: f64,

    /// JSON-lines file receiving collected rows
    #[serde(default = "default_collection_path")]
    pub path: String,
}

impl Default for CollectionSection {
    fn default() -> Self {
        Self {
            threshold_km: default_one_km(),
            path: default_collection_path(),
        }
    }
}

fn default_collection_path() -> String {
    "collected_areas.jsonl".to_string()
}

/// Overpass API settings used by `fetch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverpassSection {
    /// Interpreter endpoint
    #[serde(default = "default_overpass_url")]
    pub url: String,

    /// Server-side query timeout in seconds
    #[serde(default = "default_overpass_timeout")]
    pub timeout_secs: u64,

    /// Pause between regions in seconds
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
}

impl Default for OverpassSection {
    fn default() -> Self {
        Self {
            url: default_overpass_url(),
            timeout_secs: default_overpass_timeout(),
            pause_secs: default_pause_secs(),
        }
    }
}

fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_overpass_timeout() -> u64 {
    300
}

fn default_pause_secs() -> u64 {
    5
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for a daily rolling log file
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}
