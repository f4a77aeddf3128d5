//! Configuration for the object storage client
//!
//! Starts from the `[store]` section of `coastwalk.toml`; the environment
//! overrides it and is the only source of the service key.

use crate::error::{StoreError, StoreResult};
use coastwalk_core::config::StoreSection;
use coastwalk_core::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Environment types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local Supabase
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    /// Parse from `COASTWALK_ENV`
    pub fn from_env() -> Self {
        Self::parse(&env::var("COASTWALK_ENV").unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "development" | "dev" | "local" => Self::Development,
            "staging" | "stage" => Self::Staging,
            _ => Self::Production,
        }
    }

    fn retry(self) -> RetryConfig {
        match self {
            Self::Development => RetryConfig::quick(),
            Self::Staging | Self::Production => RetryConfig::default(),
        }
    }
}

/// Storage client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage REST endpoint, e.g. `https://<project>.supabase.co/storage/v1`
    pub storage_url: Option<String>,
    /// Service role key sent as bearer token
    #[serde(skip_serializing)]
    pub service_role_key: Option<String>,
    /// Bucket holding processed geometry
    pub bucket: String,
    /// Request timeout
    #[serde(with = "secs")]
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub environment: Environment,
}

mod secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_section(&StoreSection::default())
    }
}

impl StoreConfig {
    /// Configuration from a `[store]` section, without environment overrides
    pub fn from_section(section: &StoreSection) -> Self {
        Self {
            storage_url: section.base_url.clone(),
            service_role_key: None,
            bucket: section.bucket.clone(),
            timeout: Duration::from_secs(section.timeout_secs),
            retry: RetryConfig::default(),
            environment: Environment::default(),
        }
    }

    /// Configuration from environment variables only
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variables on top of the current values
    ///
    /// - `COASTWALK_STORAGE_URL`, else `SUPABASE_URL` + `/storage/v1`
    /// - `SUPABASE_SERVICE_ROLE_KEY`
    /// - `COASTWALK_BUCKET`
    /// - `COASTWALK_TIMEOUT_SECS`
    /// - `COASTWALK_ENV` (development/staging/production)
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env::var("COASTWALK_STORAGE_URL")
            .ok()
            .or_else(|| env::var("SUPABASE_URL").ok().map(|url| storage_endpoint(&url)))
        {
            self.storage_url = Some(url);
        }
        if let Ok(key) = env::var("SUPABASE_SERVICE_ROLE_KEY") {
            self.service_role_key = Some(key);
        }
        if let Ok(bucket) = env::var("COASTWALK_BUCKET") {
            self.bucket = bucket;
        }
        if let Some(timeout) = env::var("COASTWALK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.timeout = Duration::from_secs(timeout);
        }

        self.environment = Environment::from_env();
        self.retry = self.environment.retry();
        self
    }

    #[must_use]
    pub fn with_storage_url(mut self, url: impl Into<String>) -> Self {
        self.storage_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Storage URL, or `NotConfigured`
    pub fn require_storage_url(&self) -> StoreResult<&str> {
        match self.storage_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url.trim_end_matches('/')),
            _ => Err(StoreError::NotConfigured(
                "set COASTWALK_STORAGE_URL or SUPABASE_URL, or store.base_url in coastwalk.toml"
                    .to_string(),
            )),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> StoreResult<()> {
        let url = self.require_storage_url()?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(StoreError::NotConfigured(format!(
                "storage URL must start with http:// or https://, got {url}"
            )));
        }
        if self.bucket.trim().is_empty() {
            return Err(StoreError::NotConfigured("bucket cannot be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(StoreError::NotConfigured("timeout cannot be zero".to_string()));
        }

        Ok(())
    }
}

fn storage_endpoint(project_url: &str) -> String {
    format!("{}/storage/v1", project_url.trim_end_matches('/'))
}
