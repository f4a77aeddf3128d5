//! Region resolution through the two-tier TTL cache.
//!
//! A request names a region code and optionally a group. The resolver turns
//! that into the list of codes to cover, serves the merged geometry from the
//! cache when fresh, and otherwise fetches every code from the store,
//! skipping codes that fail.
//!
//! No cache lock is held while the store is awaited: the cache is read, the
//! read guard dropped, the origin awaited, then the result written. Two
//! concurrent misses for one key both fetch; the later write wins.

use crate::error::{ResolveError, Result};
use coastwalk_core::cache::{default_session_dir, CacheConfig, CacheTier, FileSessionStore, TieredCache};
use coastwalk_core::config::CacheSection;
use coastwalk_geo::geojson::{boundaries_document, Feature, FeatureCollection};
use coastwalk_geo::region::grouping_for;
use coastwalk_geo::sample::{sample_coastline, sample_polygons};
use coastwalk_geo::{CoastlineGeometry, PolygonFeature};
use coastwalk_store::GeometryStore;
use coastwalk_telemetry::{metrics, Timer};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Merged geometry of every region code that loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionPayload {
    pub polygons: Vec<PolygonFeature>,
    pub coastline: CoastlineGeometry,
    pub covered_region_codes: Vec<String>,
}

impl RegionPayload {
    /// The built-in placeholder, labelled as covering `region_code`
    pub fn sample(region_code: &str) -> Self {
        Self {
            polygons: sample_polygons(),
            coastline: sample_coastline(),
            covered_region_codes: vec![region_code.to_string()],
        }
    }

    /// `{ boundaries, coastline, prefectures }`
    pub fn envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope {
            boundaries: boundaries_document(&self.polygons),
            coastline: self.coastline.to_feature(),
            prefectures: self.covered_region_codes.clone(),
        }
    }
}

/// Body of a successful map-data response
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    pub boundaries: FeatureCollection,
    pub coastline: Feature,
    pub prefectures: Vec<String>,
}

/// Outcome of [`RegionResolver::resolve_or_sample`]
#[derive(Debug, Clone)]
pub struct Resolution {
    pub payload: Arc<RegionPayload>,
    /// Placeholder geometry is being shown; collecting must not persist
    pub using_sample: bool,
    /// Why real data could not be served
    pub error: Option<String>,
}

impl Resolution {
    pub fn response_envelope(&self) -> ResponseEnvelope {
        self.payload.envelope()
    }
}

/// Cache key for a request
pub fn cache_key(region_code: &str, sub_region: Option<&str>) -> String {
    format!("{}_{}", region_code, sub_region.unwrap_or("auto"))
}

pub struct RegionResolver<S> {
    store: S,
    cache: TieredCache<RegionPayload>,
}

impl<S: GeometryStore> RegionResolver<S> {
    pub fn new(store: S, cache: TieredCache<RegionPayload>) -> Self {
        Self { store, cache }
    }

    /// Resolver with a cache built from the `[cache]` section; the session
    /// tier lives on disk unless disabled.
    pub fn from_config(store: S, section: &CacheSection) -> Result<Self> {
        let mut cache = TieredCache::new(CacheConfig {
            default_ttl_secs: section.ttl_secs,
            memory_capacity: section.memory_capacity,
        });

        if section.session_enabled {
            let dir = section
                .session_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(default_session_dir);
            cache = cache.with_session(FileSessionStore::new(dir)?);
        }

        Ok(Self::new(store, cache))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &TieredCache<RegionPayload> {
        &self.cache
    }

    /// Geometry for `region_code`, or for the group `sub_region` names.
    pub async fn resolve(&self, region_code: &str, sub_region: Option<&str>) -> Result<Arc<RegionPayload>> {
        let key = cache_key(region_code, sub_region);

        match self.cache.get(&key) {
            Ok(Some(hit)) => {
                metrics().increment(match hit.tier {
                    CacheTier::Memory => "resolver.cache_hit.memory",
                    CacheTier::Session => "resolver.cache_hit.session",
                });
                debug!(key = %key, tier = ?hit.tier, "region cache hit");
                return Ok(hit.value);
            }
            Ok(None) => {}
            Err(e) => {
                metrics().increment("resolver.cache_error");
                warn!(key = %key, error = %e, "region cache read failed, treating as miss");
            }
        }
        metrics().increment("resolver.cache_miss");

        let codes = grouping_for(region_code, sub_region);
        let payload = self.fetch_all(&codes).await;

        if payload.covered_region_codes.is_empty() {
            return Err(ResolveError::NoRegionData {
                region_code: region_code.to_string(),
                attempted: codes,
            });
        }

        info!(
            key = %key,
            covered = payload.covered_region_codes.len(),
            requested = codes.len(),
            polygons = payload.polygons.len(),
            "resolved region from origin"
        );
        match self.cache.insert(&key, payload.clone()) {
            Ok(shared) => Ok(shared),
            Err(e) => {
                metrics().increment("resolver.cache_error");
                warn!(key = %key, error = %e, "region cache write failed");
                Ok(Arc::new(payload))
            }
        }
    }

    /// [`resolve`](Self::resolve), falling back to the built-in sample when
    /// no region data can be loaded.
    pub async fn resolve_or_sample(&self, region_code: &str, sub_region: Option<&str>) -> Resolution {
        match self.resolve(region_code, sub_region).await {
            Ok(payload) => Resolution {
                payload,
                using_sample: false,
                error: None,
            },
            Err(e) => {
                warn!(region = %region_code, error = %e, "falling back to sample geometry");
                metrics().increment("resolver.sample_fallback");
                Resolution {
                    payload: Arc::new(RegionPayload::sample(region_code)),
                    using_sample: true,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn fetch_all(&self, codes: &[String]) -> RegionPayload {
        let _timer = Timer::start("resolver.origin_fetch_ms");
        let mut payload = RegionPayload::default();

        for code in codes {
            metrics().increment("resolver.origin_fetch");
            let (boundaries, coastline) =
                tokio::join!(self.store.fetch_boundaries(code), self.store.fetch_coastline(code));

            match (boundaries, coastline) {
                (Ok(polygons), Ok(coastline)) => {
                    payload.polygons.extend(polygons);
                    payload.coastline.extend(coastline);
                    payload.covered_region_codes.push(code.clone());
                }
                (Err(e), _) | (_, Err(e)) => {
                    metrics().increment("resolver.origin_failure");
                    warn!(region = %code, error = %e, "skipping region");
                }
            }
        }

        payload
    }
}
