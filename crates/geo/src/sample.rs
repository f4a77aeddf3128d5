//! Built-in placeholder geometry, shown when no real data is available.
//!
//! Two adjacent 0.1° squares south-west of Tokyo and a coastline of two
//! three-point lines along their southern and northern edges.

use crate::assemble::{PolygonFeature, PolygonRings};
use crate::coastline::CoastlineGeometry;
use std::collections::BTreeMap;

pub const SAMPLE_AREA_1: &str = "サンプルエリア1";
pub const SAMPLE_AREA_2: &str = "サンプルエリア2";

fn square(name: &str, west: f64, east: f64) -> PolygonFeature {
    let (south, north) = (35.5, 35.6);
    PolygonFeature {
        properties: BTreeMap::from([("name".to_string(), name.to_string())]),
        polygons: vec![PolygonRings {
            exterior: vec![
                [west, south],
                [east, south],
                [east, north],
                [west, north],
                [west, south],
            ],
            interiors: vec![],
        }],
    }
}

pub fn sample_polygons() -> Vec<PolygonFeature> {
    vec![
        square(SAMPLE_AREA_1, 139.5, 139.6),
        square(SAMPLE_AREA_2, 139.6, 139.7),
    ]
}

pub fn sample_coastline() -> CoastlineGeometry {
    CoastlineGeometry::new(vec![
        vec![[139.5, 35.5], [139.6, 35.5], [139.7, 35.5]],
        vec![[139.5, 35.6], [139.6, 35.6], [139.7, 35.6]],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{distance_to_nearest, locate, Coordinate};

    #[test]
    fn test_sample_queries() {
        let polygons = sample_polygons();
        let coastline = sample_coastline();

        let point = Coordinate::new(35.55, 139.65);
        assert_eq!(locate(&point, &polygons).and_then(|f| f.name()), Some(SAMPLE_AREA_2));

        // 0.05° of latitude from either line
        let d = distance_to_nearest(&point, &coastline);
        assert!((d - 5.56).abs() < 0.01, "{}", d);
    }

    #[test]
    fn test_sample_polygons_have_area() {
        for polygon in sample_polygons() {
            assert!(polygon.area() > 0.0);
        }
        assert_eq!(sample_coastline().segment_count(), 4);
    }
}
