//! Point-in-polygon and point-to-coastline queries.
//!
//! Distances are measured in a local equirectangular plane centred on the
//! query point: longitude degrees are scaled by `cos(latitude)`, then both
//! axes by the length of one degree on a 6371 km sphere.
//!
//! [`distance_to_nearest`] trades exactness for latency on large coastlines:
//! past `sample_budget` segments only every `segments / sample_budget`-th
//! segment is measured, and the search stops at the first segment closer
//! than `early_exit_km`. Use [`distance_to_nearest_exact`] when the true
//! minimum matters.

use crate::assemble::PolygonFeature;
use crate::coastline::CoastlineGeometry;
use crate::{Coordinate, Position, EARTH_RADIUS_KM};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Segments measured exhaustively before stride sampling starts
pub const SAMPLE_BUDGET: usize = 50;

/// Sampled search stops at the first segment closer than this
pub const EARLY_EXIT_KM: f64 = 1.0;

const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * PI / 180.0;

/// Tuning for the sampled distance search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    pub sample_budget: usize,
    pub early_exit_km: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            sample_budget: SAMPLE_BUDGET,
            early_exit_km: EARLY_EXIT_KM,
        }
    }
}

/// First polygon, in input order, containing the point (boundary included).
///
/// Administrative boundaries are not expected to overlap; where they do,
/// the earlier feature wins.
pub fn locate<'a>(point: &Coordinate, polygons: &'a [PolygonFeature]) -> Option<&'a PolygonFeature> {
    polygons.iter().find(|feature| feature.contains(point))
}

/// Approximate distance in km from the point to the coastline.
///
/// Returns `f64::INFINITY` for an empty coastline.
pub fn distance_to_nearest(point: &Coordinate, coastline: &CoastlineGeometry) -> f64 {
    distance_to_nearest_with(point, coastline, &ProximityConfig::default())
}

/// [`distance_to_nearest`] with explicit tuning.
pub fn distance_to_nearest_with(
    point: &Coordinate,
    coastline: &CoastlineGeometry,
    config: &ProximityConfig,
) -> f64 {
    let budget = config.sample_budget.max(1);
    let total = coastline.segment_count();
    let stride = if total > budget { (total / budget).max(1) } else { 1 };

    let mut best = f64::INFINITY;
    for (a, b) in coastline.segments().step_by(stride) {
        let d = point_segment_distance_km(point, a, b);
        if d < best {
            best = d;
            if best < config.early_exit_km {
                break;
            }
        }
    }
    best
}

/// True minimum distance in km over every segment.
pub fn distance_to_nearest_exact(point: &Coordinate, coastline: &CoastlineGeometry) -> f64 {
    coastline
        .segments()
        .map(|(a, b)| point_segment_distance_km(point, a, b))
        .fold(f64::INFINITY, f64::min)
}

/// Planar distance in km from a point to the segment `a`–`b`.
pub fn point_segment_distance_km(point: &Coordinate, a: Position, b: Position) -> f64 {
    let scale_x = KM_PER_DEGREE * point.latitude.to_radians().cos();
    let project = |p: Position| {
        (
            (p[0] - point.longitude) * scale_x,
            (p[1] - point.latitude) * KM_PER_DEGREE,
        )
    };

    let (ax, ay) = project(a);
    let (bx, by) = project(b);
    let (dx, dy) = (bx - ax, by - ay);

    let len2 = dx * dx + dy * dy;
    // Degenerate segment: distance to its single point
    let t = if len2 == 0.0 {
        0.0
    } else {
        (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0)
    };

    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (cx * cx + cy * cy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haversine_distance;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn square(name: &str, lon0: f64, lat0: f64, size: f64) -> PolygonFeature {
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), name.to_string());
        PolygonFeature {
            properties,
            polygons: vec![crate::assemble::PolygonRings {
                exterior: vec![
                    [lon0, lat0],
                    [lon0 + size, lat0],
                    [lon0 + size, lat0 + size],
                    [lon0, lat0 + size],
                    [lon0, lat0],
                ],
                interiors: vec![],
            }],
        }
    }

    #[test]
    fn test_locate_disjoint() {
        let polygons = vec![square("A", 139.5, 35.5, 0.1), square("B", 139.7, 35.5, 0.1)];

        let hit = locate(&Coordinate::new(35.55, 139.75), &polygons).unwrap();
        assert_eq!(hit.name(), Some("B"));

        assert!(locate(&Coordinate::new(35.55, 139.65), &polygons).is_none());
        assert!(locate(&Coordinate::new(40.0, 139.55), &polygons).is_none());
    }

    #[test]
    fn test_locate_overlap_prefers_input_order() {
        let polygons = vec![square("First", 0.0, 0.0, 2.0), square("Second", 1.0, 1.0, 2.0)];
        let hit = locate(&Coordinate::new(1.5, 1.5), &polygons).unwrap();
        assert_eq!(hit.name(), Some("First"));
    }

    #[test]
    fn test_locate_on_boundary_counts() {
        let polygons = vec![square("A", 0.0, 0.0, 1.0)];
        assert!(locate(&Coordinate::new(0.0, 0.5), &polygons).is_some());
    }

    #[test]
    fn test_single_segment_closed_form() {
        let coastline = CoastlineGeometry::new(vec![vec![[139.5, 35.5], [139.7, 35.5]]]);

        // Perpendicular foot inside the segment
        let point = Coordinate::new(35.51, 139.6);
        let expected = 0.01 * KM_PER_DEGREE;
        assert!((distance_to_nearest(&point, &coastline) - expected).abs() < 1e-9);

        // Past the end: distance to the endpoint
        let point = Coordinate::new(35.5, 139.8);
        let expected = 0.1 * KM_PER_DEGREE * 35.5f64.to_radians().cos();
        assert!((distance_to_nearest(&point, &coastline) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_planar_distance_tracks_haversine() {
        let coastline = CoastlineGeometry::new(vec![vec![[139.5, 35.5], [139.7, 35.5]]]);
        let point = Coordinate::new(35.53, 139.62);
        let planar = distance_to_nearest_exact(&point, &coastline);
        let spherical = haversine_distance(&point, &Coordinate::new(35.5, 139.62));
        assert!(((planar - spherical) / spherical).abs() < 0.001);
    }

    #[test]
    fn test_empty_coastline_is_infinite() {
        let coastline = CoastlineGeometry::default();
        let point = Coordinate::new(35.0, 139.0);
        assert!(distance_to_nearest(&point, &coastline).is_infinite());
        assert!(distance_to_nearest_exact(&point, &coastline).is_infinite());
    }

    #[test]
    fn test_sampling_can_miss_the_nearest_segment() {
        // 100 segments far away, except segment 51 which passes the point
        let mut line: Vec<Position> = (0..=100).map(|i| [140.0 + i as f64 * 0.01, 36.0]).collect();
        line[51] = [139.6, 35.5];
        line[52] = [139.61, 35.5];
        let coastline = CoastlineGeometry::new(vec![line]);
        let point = Coordinate::new(35.5, 139.605);

        let exact = distance_to_nearest_exact(&point, &coastline);
        let sampled = distance_to_nearest(&point, &coastline);

        assert!(exact < 1e-9);
        assert!(sampled > exact);
    }

    #[test]
    fn test_early_exit_returns_first_good_enough() {
        let coastline = CoastlineGeometry::new(vec![
            // ~0.56 km away
            vec![[139.5, 35.505], [139.7, 35.505]],
            // ~0.11 km away
            vec![[139.5, 35.501], [139.7, 35.501]],
        ]);
        let point = Coordinate::new(35.5, 139.6);

        let sampled = distance_to_nearest(&point, &coastline);
        let exact = distance_to_nearest_exact(&point, &coastline);

        assert!((sampled - 0.005 * KM_PER_DEGREE).abs() < 1e-9);
        assert!((exact - 0.001 * KM_PER_DEGREE).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn exact_never_exceeds_sampled(
            lines in proptest::collection::vec(
                proptest::collection::vec((139.0f64..140.0, 35.0f64..36.0), 2..30),
                1..6,
            ),
            lat in 35.0f64..36.0,
            lon in 139.0f64..140.0,
        ) {
            let coastline = CoastlineGeometry::new(
                lines.into_iter().map(|l| l.into_iter().map(|(x, y)| [x, y]).collect()).collect(),
            );
            let point = Coordinate::new(lat, lon);
            prop_assert!(
                distance_to_nearest_exact(&point, &coastline) <= distance_to_nearest(&point, &coastline)
            );
        }
    }
}
