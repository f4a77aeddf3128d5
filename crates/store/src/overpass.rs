//! Overpass API downloads and the on-disk raw batch layout.
//!
//! Raw batches live at `{raw_dir}/{region}/{file}` and are exactly what the
//! interpreter returned, so `process` can be rerun without refetching.

use crate::error::{StoreError, StoreResult};
use coastwalk_core::retry::RetryConfig;
use coastwalk_geo::RegionInput;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// The three raw batches fetched per region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverpassTarget {
    Coastline,
    AdminBoundaries,
    Islands,
}

impl OverpassTarget {
    pub const ALL: [OverpassTarget; 3] = [Self::Coastline, Self::AdminBoundaries, Self::Islands];

    /// Overpass QL statement selecting the target inside `area.area`
    pub fn selector(self) -> &'static str {
        match self {
            Self::Coastline => r#"way(area.area)["natural"="coastline"];"#,
            Self::AdminBoundaries => {
                r#"relation(area.area)["boundary"="administrative"]["admin_level"~"^[789]$"];"#
            }
            Self::Islands => r#"relation(area.area)["place"~"^(island|islet)$"];"#,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Coastline => "coastline.geojson",
            Self::AdminBoundaries => "boundaries_admin.geojson",
            Self::Islands => "boundaries_islands.geojson",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Coastline => "coastline",
            Self::AdminBoundaries => "admin boundaries",
            Self::Islands => "islands",
        }
    }
}

/// Full query for one target in one ISO 3166-2 area
pub fn build_query(region_code: &str, target: OverpassTarget, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{timeout_secs}];\narea[\"ISO3166-2\"=\"{region_code}\"]->.area;\n({});\n(._;>;);\nout geom;",
        target.selector()
    )
}

/// Overpass interpreter client
#[derive(Debug, Clone)]
pub struct OverpassClient {
    inner: Client,
    url: String,
    query_timeout_secs: u64,
    retry: RetryConfig,
}

impl OverpassClient {
    /// `query_timeout_secs` is the server-side limit; the HTTP timeout gets a
    /// minute on top of it.
    pub fn new(url: impl Into<String>, query_timeout_secs: u64) -> StoreResult<Self> {
        let inner = Client::builder()
            .timeout(Duration::from_secs(query_timeout_secs + 60))
            .user_agent(concat!("coastwalk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner,
            url: url.into(),
            query_timeout_secs,
            retry: RetryConfig::patient(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Download one raw batch, returned undecoded
    #[instrument(skip(self, target), fields(target = target.label()))]
    pub async fn fetch(&self, region_code: &str, target: OverpassTarget) -> StoreResult<Vec<u8>> {
        let query = build_query(region_code, target, self.query_timeout_secs);
        let mut last_error = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for_attempt(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying Overpass query");
                tokio::time::sleep(delay).await;
            }

            match self.fetch_once(&query).await {
                Ok(bytes) => {
                    info!(region = %region_code, bytes = bytes.len(), "downloaded {}", target.label());
                    return Ok(bytes);
                }
                Err(e) if e.is_retryable() => {
                    warn!(region = %region_code, attempt = attempt + 1, error = %e, "Overpass request failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::RetriesExhausted {
            attempts: self.retry.max_attempts,
            last_error: last_error.map_or_else(|| "Unknown error".to_string(), |e| e.to_string()),
        })
    }

    async fn fetch_once(&self, query: &str) -> StoreResult<Vec<u8>> {
        let response = self.inner.post(&self.url).form(&[("data", query)]).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(StoreError::api_response(status.as_u16(), message))
        }
    }
}

/// Directory of raw batches, one subdirectory per region
#[derive(Debug, Clone)]
pub struct RawDataDir {
    root: PathBuf,
}

impl RawDataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, region_code: &str, target: OverpassTarget) -> PathBuf {
        self.root.join(region_code).join(target.file_name())
    }

    pub async fn write(&self, region_code: &str, target: OverpassTarget, bytes: &[u8]) -> StoreResult<PathBuf> {
        let path = self.path_for(region_code, target);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// All three batches of a region, ready for processing
    pub async fn read_region(&self, region_code: &str) -> StoreResult<RegionInput> {
        let read = |target| {
            let path = self.path_for(region_code, target);
            async move {
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| StoreError::not_found(path.display().to_string(), e.to_string()))
            }
        };

        Ok(RegionInput {
            code: region_code.to_string(),
            admin: read(OverpassTarget::AdminBoundaries).await?,
            islands: read(OverpassTarget::Islands).await?,
            coastline: read(OverpassTarget::Coastline).await?,
        })
    }

    /// Region codes that have a subdirectory, sorted
    pub async fn regions(&self) -> StoreResult<Vec<String>> {
        let mut regions = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(regions),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                regions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        regions.sort();
        Ok(regions)
    }
}
