//! Telemetry and metrics for coastwalk
//!
//! - Structured logging with tracing (compact or JSON, optional rolling file)
//! - An in-process metrics registry with JSON export
//! - Timers feeding duration histograms

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Global metrics registry
static METRICS: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

/// Global session ID for correlating logs
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "coastwalk.log";

/// Initialize with custom configuration
///
/// Console output goes to stderr so stdout stays machine readable. When a
/// log directory is set, the returned guard must be held until exit or
/// buffered file lines are lost.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let compact_layer = (!config.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number)
            .compact()
    });

    let json_layer = config.json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .with_current_span(true)
    });

    let (file_layer, guard) = match &config.log_directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(compact_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        json = config.json,
        "Telemetry initialized"
    );

    Ok(guard)
}

/// Get the current session ID
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// JSON lines instead of compact text
    pub json: bool,
    /// Directory for a daily rolling JSON log file
    pub log_directory: Option<PathBuf>,
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub show_file: bool,
    pub show_line_number: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            log_directory: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

impl TelemetryConfig {
    /// `format` is `"json"` or anything else for compact output
    pub fn new(log_level: impl Into<String>, format: &str) -> Self {
        Self {
            log_level: log_level.into(),
            json: format.eq_ignore_ascii_case("json"),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_log_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_directory = Some(dir.into());
        self
    }

    /// Debug-level output with source locations
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.log_level = "debug".to_string();
        self.show_target = true;
        self.show_file = true;
        self.show_line_number = true;
        self
    }
}

#[derive(Debug, Default)]
struct MetricsState {
    counters: BTreeMap<String, u64>,
    gauges: BTreeMap<String, u64>,
    histograms: BTreeMap<String, Vec<f64>>,
}

/// In-process counters, gauges and histograms for one run
pub struct MetricsRegistry {
    state: Mutex<MetricsState>,
    start_time: Instant,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MetricsState::default()),
            start_time: Instant::now(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn increment(&self, name: &str) {
        self.increment_by(name, 1);
    }

    pub fn increment_by(&self, name: &str, value: u64) {
        *self.state().counters.entry(name.to_string()).or_default() += value;
    }

    /// Current counter value, 0 if never incremented
    pub fn counter(&self, name: &str) -> u64 {
        self.state().counters.get(name).copied().unwrap_or(0)
    }

    pub fn gauge(&self, name: &str, value: u64) {
        self.state().gauges.insert(name.to_string(), value);
    }

    pub fn histogram(&self, name: &str, value: f64) {
        self.state()
            .histograms
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Point-in-time copy with histogram summaries
    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state();
        MetricsSnapshot {
            session_id: session_id().to_string(),
            uptime_secs: self.uptime_secs(),
            counters: state.counters.clone(),
            gauges: state.gauges.clone(),
            histograms: state
                .histograms
                .iter()
                .map(|(name, values)| (name.clone(), HistogramStats::from_values(values)))
                .collect(),
        }
    }

    pub fn export_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

/// Serializable view of a [`MetricsRegistry`], keys sorted
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub session_id: String,
    pub uptime_secs: u64,
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, u64>,
    pub histograms: BTreeMap<String, HistogramStats>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HistogramStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
}

impl HistogramStats {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        let rank = |p: f64| sorted[((p * (count - 1) as f64).round() as usize).min(count - 1)];

        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sorted.iter().sum::<f64>() / count as f64,
            p50: rank(0.50),
            p95: rank(0.95),
        }
    }
}

/// The process-wide registry
pub fn metrics() -> &'static MetricsRegistry {
    &METRICS
}

/// Records elapsed milliseconds into a histogram, once
pub struct Timer {
    name: String,
    start: Instant,
    recorded: bool,
}

impl Timer {
    /// Start a new timer
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            recorded: false,
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(mut self) -> Duration {
        let duration = self.record();
        tracing::debug!(
            metric = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Timer completed"
        );
        duration
    }

    fn record(&mut self) -> Duration {
        let duration = self.start.elapsed();
        if !self.recorded {
            metrics().histogram(&self.name, duration.as_secs_f64() * 1000.0);
            self.recorded = true;
        }
        duration
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.record();
    }
}

/// A domain event, logged at info with its payload
#[derive(Debug, Serialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub event_type: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id().to_string(),
            event_type: event_type.into(),
            data,
        }
    }

    pub fn log(&self) {
        tracing::info!(
            event_type = %self.event_type,
            data = %self.data,
            "{}", self.event_type
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counter() {
        let registry = MetricsRegistry::new();
        registry.increment("resolver.cache_miss");
        registry.increment("resolver.cache_miss");
        registry.increment_by("resolver.cache_miss", 3);

        assert_eq!(registry.counter("resolver.cache_miss"), 5);
        assert_eq!(registry.counter("never.touched"), 0);
    }

    #[test]
    fn test_metrics_gauge() {
        let registry = MetricsRegistry::new();
        registry.gauge("cache.memory_entries", 42);
        registry.gauge("cache.memory_entries", 7);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.gauges["cache.memory_entries"], 7);
        assert_eq!(registry.export_json()["gauges"]["cache.memory_entries"], 7);
    }

    #[test]
    fn test_histogram_stats() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let stats = HistogramStats::from_values(&values);

        assert_eq!(stats.count, 10);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 10.0);
        assert_eq!(stats.mean, 5.5);
        assert_eq!(stats.p95, 10.0);
        assert_eq!(HistogramStats::from_values(&[]).count, 0);
    }

    #[test]
    fn test_timer_records_once() {
        let name = format!("test_timer_{}", Uuid::new_v4());
        let timer = Timer::start(name.as_str());
        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.stop();
        assert!(duration.as_millis() >= 10);

        let exported = metrics().export_json();
        assert_eq!(exported["histograms"][name.as_str()]["count"], 1);
    }

    #[test]
    fn test_config_format() {
        assert!(TelemetryConfig::new("info", "JSON").json);
        assert!(!TelemetryConfig::new("info", "compact").json);
        assert_eq!(TelemetryConfig::default().verbose().log_level, "debug");
    }

    #[test]
    fn test_init_with_log_directory() {
        let temp = tempfile::tempdir().unwrap();
        let config = TelemetryConfig::new("debug", "json").with_log_directory(temp.path());
        let guard = init_with_config(config).unwrap();
        assert!(guard.is_some());

        // A second global subscriber is refused
        assert!(init_with_config(TelemetryConfig::default()).is_err());
    }

    #[test]
    fn test_session_id() {
        let id = session_id();
        assert!(!id.is_empty());
        assert!(Uuid::parse_str(id).is_ok());
    }
}
