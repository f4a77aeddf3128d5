//! Position check: which area the user is in, how far the coast is, and
//! whether that newly collects the area.

use crate::error::Result;
use crate::resolve::Resolution;
use coastwalk_geo::proximity::distance_to_nearest_with;
use coastwalk_geo::{locate, reconcile_with_threshold, Coordinate, ProximityConfig, COLLECTION_THRESHOLD_KM};
use coastwalk_store::CollectionStore;
use coastwalk_telemetry::{metrics, Event};
use serde::Serialize;
use tracing::debug;

/// Result of one [`Tracker::check`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub user_id: String,
    pub position: Coordinate,
    /// Name of the containing area, if any
    pub area_name: Option<String>,
    /// `None` when there is no coastline to measure against
    pub distance_km: Option<f64>,
    pub should_collect: bool,
    /// A row was written by this check
    pub collected: bool,
    pub using_sample: bool,
}

pub struct Tracker<C> {
    collections: C,
    threshold_km: f64,
    proximity: ProximityConfig,
}

impl<C: CollectionStore> Tracker<C> {
    pub fn new(collections: C) -> Self {
        Self {
            collections,
            threshold_km: COLLECTION_THRESHOLD_KM,
            proximity: ProximityConfig::default(),
        }
    }

    #[must_use]
    pub fn with_threshold_km(mut self, threshold_km: f64) -> Self {
        self.threshold_km = threshold_km;
        self
    }

    #[must_use]
    pub fn with_proximity(mut self, proximity: ProximityConfig) -> Self {
        self.proximity = proximity;
        self
    }

    pub fn collections(&self) -> &C {
        &self.collections
    }

    /// locate → distance → reconcile → append.
    ///
    /// Sample geometry is evaluated the same way but never persisted.
    pub async fn check(&self, user_id: &str, position: &Coordinate, resolution: &Resolution) -> Result<CheckOutcome> {
        let payload = &resolution.payload;

        let area_name = locate(position, &payload.polygons)
            .and_then(|feature| feature.name())
            .map(str::to_string);
        let distance = distance_to_nearest_with(position, &payload.coastline, &self.proximity);

        let should_collect = match &area_name {
            Some(name) => {
                let already = self.collections.collected(user_id).await?;
                reconcile_with_threshold(name, &already, distance, self.threshold_km).should_collect
            }
            None => false,
        };

        let collected = match (&area_name, should_collect && !resolution.using_sample) {
            (Some(name), true) => self.collections.append(user_id, name).await?,
            _ => false,
        };

        if collected {
            metrics().increment("tracker.collected");
            Event::new(
                "area_collected",
                serde_json::json!({ "user_id": user_id, "area_name": area_name, "distance_km": distance }),
            )
            .log();
        } else {
            debug!(user_id, area = ?area_name, distance_km = distance, should_collect, "position checked");
        }

        Ok(CheckOutcome {
            user_id: user_id.to_string(),
            position: *position,
            area_name,
            distance_km: distance.is_finite().then_some(distance),
            should_collect,
            collected,
            using_sample: resolution.using_sample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::RegionPayload;
    use coastwalk_geo::sample::{SAMPLE_AREA_1, SAMPLE_AREA_2};
    use coastwalk_geo::CoastlineGeometry;
    use coastwalk_store::MemoryCollectionStore;
    use std::sync::Arc;

    fn real(payload: RegionPayload) -> Resolution {
        Resolution {
            payload: Arc::new(payload),
            using_sample: false,
            error: None,
        }
    }

    /// Sample squares with a coastline along 35.55N
    fn coastal_payload() -> RegionPayload {
        RegionPayload {
            coastline: CoastlineGeometry::new(vec![vec![[139.5, 35.55], [139.7, 35.55]]]),
            ..RegionPayload::sample("JP-14")
        }
    }

    #[tokio::test]
    async fn test_collects_once_near_coast() {
        let tracker = Tracker::new(MemoryCollectionStore::new());
        let resolution = real(coastal_payload());
        let near = Coordinate::new(35.552, 139.65);

        let first = tracker.check("u1", &near, &resolution).await.unwrap();
        assert_eq!(first.area_name.as_deref(), Some(SAMPLE_AREA_2));
        assert!(first.distance_km.unwrap() < 1.0);
        assert!(first.should_collect);
        assert!(first.collected);

        let again = tracker.check("u1", &near, &resolution).await.unwrap();
        assert!(!again.should_collect);
        assert!(!again.collected);
        assert_eq!(tracker.collections().rows().len(), 1);
    }

    #[tokio::test]
    async fn test_far_from_coast_does_not_collect() {
        let tracker = Tracker::new(MemoryCollectionStore::new());
        let resolution = real(coastal_payload());

        // ~4.4 km south of the line, still inside area 1
        let outcome = tracker
            .check("u1", &Coordinate::new(35.51, 139.55), &resolution)
            .await
            .unwrap();
        assert_eq!(outcome.area_name.as_deref(), Some(SAMPLE_AREA_1));
        assert!(!outcome.should_collect);
        assert!(tracker.collections().rows().is_empty());
    }

    #[tokio::test]
    async fn test_outside_every_area() {
        let tracker = Tracker::new(MemoryCollectionStore::new());
        let outcome = tracker
            .check("u1", &Coordinate::new(35.55, 139.75), &real(coastal_payload()))
            .await
            .unwrap();
        assert!(outcome.area_name.is_none());
        assert!(!outcome.should_collect);
    }

    #[tokio::test]
    async fn test_sample_data_is_never_persisted() {
        let tracker = Tracker::new(MemoryCollectionStore::new());
        let resolution = Resolution {
            using_sample: true,
            ..real(coastal_payload())
        };

        let outcome = tracker
            .check("u1", &Coordinate::new(35.552, 139.65), &resolution)
            .await
            .unwrap();
        assert!(outcome.should_collect);
        assert!(!outcome.collected);
        assert!(outcome.using_sample);
        assert!(tracker.collections().rows().is_empty());
    }

    #[tokio::test]
    async fn test_empty_coastline() {
        let tracker = Tracker::new(MemoryCollectionStore::new()).with_threshold_km(5.0);
        let payload = RegionPayload {
            coastline: CoastlineGeometry::default(),
            ..RegionPayload::sample("JP-14")
        };
        let outcome = tracker
            .check("u1", &Coordinate::new(35.55, 139.55), &real(payload))
            .await
            .unwrap();
        assert_eq!(outcome.distance_km, None);
        assert!(!outcome.should_collect);
    }
}
