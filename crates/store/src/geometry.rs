//! Processed geometry documents, keyed by region code and kind.
//!
//! Every backend stores opaque byte documents under
//! `{region}/{kind}_processed.geojson`; the provided methods of
//! [`GeometryStore`] do the GeoJSON encoding and decoding on top.

use crate::error::{StoreError, StoreResult};
use coastwalk_geo::geojson::{boundaries_document, boundaries_from_document, Feature, FeatureCollection};
use coastwalk_geo::{CoastlineGeometry, PolygonFeature, ProcessedRegion};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use tracing::{debug, info};

/// The two documents published per region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Boundaries,
    Coastline,
}

impl GeometryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boundaries => "boundaries",
            Self::Coastline => "coastline",
        }
    }

    /// Object path inside the bucket
    pub fn object_path(self, region_code: &str) -> String {
        format!("{region_code}/{}_processed.geojson", self.as_str())
    }
}

impl std::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place processed geometry is published to and fetched from.
///
/// `put_document` must upsert. `get_document` reports a missing object (or
/// an unreachable origin) as [`StoreError::NotFound`].
pub trait GeometryStore: Send + Sync {
    fn put_document(&self, path: &str, body: Vec<u8>) -> impl Future<Output = StoreResult<()>> + Send;

    fn get_document(&self, path: &str) -> impl Future<Output = StoreResult<Vec<u8>>> + Send;

    /// Publish boundaries, dropping features without a `name`.
    ///
    /// Returns the number of features written.
    fn publish_boundaries(
        &self,
        region_code: &str,
        features: &[PolygonFeature],
    ) -> impl Future<Output = StoreResult<usize>> + Send {
        let path = GeometryKind::Boundaries.object_path(region_code);
        let named: Vec<PolygonFeature> = features.iter().filter(|f| f.name().is_some()).cloned().collect();
        let count = named.len();
        let body = serde_json::to_vec(&boundaries_document(&named));

        async move {
            self.put_document(&path, body?).await?;
            debug!(path = %path, features = count, "published boundaries");
            Ok(count)
        }
    }

    fn publish_coastline(
        &self,
        region_code: &str,
        coastline: &CoastlineGeometry,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let path = GeometryKind::Coastline.object_path(region_code);
        let body = serde_json::to_vec(&coastline.to_feature());

        async move {
            self.put_document(&path, body?).await?;
            debug!(path = %path, "published coastline");
            Ok(())
        }
    }

    /// Publish both documents of an already processed region, boundaries
    /// first.
    fn publish_region(&self, region: &ProcessedRegion) -> impl Future<Output = StoreResult<usize>> + Send {
        async move {
            let published = self.publish_boundaries(&region.code, &region.boundaries).await?;
            self.publish_coastline(&region.code, &region.coastline).await?;
            info!(region = %region.code, boundaries = published, "published region");
            Ok(published)
        }
    }

    fn fetch_boundaries(&self, region_code: &str) -> impl Future<Output = StoreResult<Vec<PolygonFeature>>> + Send {
        let path = GeometryKind::Boundaries.object_path(region_code);

        async move {
            let bytes = self.get_document(&path).await?;
            let document: FeatureCollection =
                serde_json::from_slice(&bytes).map_err(|e| StoreError::malformed(&path, e))?;
            boundaries_from_document(document).map_err(|e| StoreError::malformed(&path, e))
        }
    }

    fn fetch_coastline(&self, region_code: &str) -> impl Future<Output = StoreResult<CoastlineGeometry>> + Send {
        let path = GeometryKind::Coastline.object_path(region_code);

        async move {
            let bytes = self.get_document(&path).await?;
            let feature: Feature = serde_json::from_slice(&bytes).map_err(|e| StoreError::malformed(&path, e))?;
            CoastlineGeometry::from_feature(feature).map_err(|e| StoreError::malformed(&path, e))
        }
    }
}

/// In-memory store for tests and offline runs
#[derive(Debug, Default)]
pub struct MemoryGeometryStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    gets: AtomicUsize,
}

impl MemoryGeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get_document` calls served so far, hits and misses
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.read().map(|o| o.contains_key(path)).unwrap_or(false)
    }

    /// Store a raw document, bypassing encoding
    pub fn insert_raw(&self, path: impl Into<String>, body: impl Into<Vec<u8>>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(path.into(), body.into());
        }
    }
}

impl GeometryStore for MemoryGeometryStore {
    async fn put_document(&self, path: &str, body: Vec<u8>) -> StoreResult<()> {
        self.objects
            .write()
            .map_err(|_| StoreError::not_found(path, "store lock poisoned"))?
            .insert(path.to_string(), body);
        Ok(())
    }

    async fn get_document(&self, path: &str) -> StoreResult<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.objects
            .read()
            .map_err(|_| StoreError::not_found(path, "store lock poisoned"))?
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::not_found(path, "no such object"))
    }
}

/// Directory tree with the bucket layout, e.g. `processed_data/JP-13/...`
#[derive(Debug, Clone)]
pub struct FsGeometryStore {
    root: PathBuf,
}

impl FsGeometryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl GeometryStore for FsGeometryStore {
    async fn put_document(&self, path: &str, body: Vec<u8>) -> StoreResult<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never see a half-written document
        let tmp = target.with_extension("geojson.tmp");
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn get_document(&self, path: &str) -> StoreResult<Vec<u8>> {
        tokio::fs::read(self.resolve(path))
            .await
            .map_err(|e| StoreError::not_found(path, e.to_string()))
    }
}
