//! Offline processing of raw region batches with optional parallelism.
//!
//! Input bytes are read by the caller; everything here is CPU bound
//! (decode, assemble, linearize) so regions can fan out over a rayon pool.

use crate::assemble::{assemble, PolygonFeature};
use crate::coastline::{linearize, CoastlineGeometry};
use crate::osm::{merge_batches, parse_batch};
use crate::Result;
use serde::Serialize;
use tracing::{info, warn};

/// Raw Overpass documents for one region.
#[derive(Debug, Clone)]
pub struct RegionInput {
    pub code: String,
    pub admin: Vec<u8>,
    pub islands: Vec<u8>,
    pub coastline: Vec<u8>,
}

/// Both documents of a region, built before anything is published.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedRegion {
    pub code: String,
    pub boundaries: Vec<PolygonFeature>,
    pub coastline: CoastlineGeometry,
}

impl ProcessedRegion {
    /// Boundaries that carry a `name` tag.
    pub fn named_boundary_count(&self) -> usize {
        self.boundaries.iter().filter(|f| f.name().is_some()).count()
    }
}

/// Decode, assemble and linearize one region.
///
/// Any malformed document fails the whole region.
pub fn process_region(input: &RegionInput) -> Result<ProcessedRegion> {
    let admin = parse_batch(&input.admin)?;
    let islands = parse_batch(&input.islands)?;
    let boundaries = assemble(&merge_batches([admin, islands]))?;

    let coastline = linearize(&parse_batch(&input.coastline)?);

    info!(
        region = %input.code,
        boundaries = boundaries.len(),
        coastline_lines = coastline.lines.len(),
        "processed region"
    );

    Ok(ProcessedRegion {
        code: input.code.clone(),
        boundaries,
        coastline,
    })
}

/// Process many regions; results keep input order.
///
/// A failing region is logged and reported in its slot; it never stops the
/// others.
pub fn process_regions(inputs: &[RegionInput]) -> Vec<(String, Result<ProcessedRegion>)> {
    let run = |input: &RegionInput| {
        let result = process_region(input);
        if let Err(e) = &result {
            warn!(region = %input.code, error = %e, "region processing failed");
        }
        (input.code.clone(), result)
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        inputs.par_iter().map(run).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        inputs.iter().map(run).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoError;

    fn input(code: &str, admin: &str) -> RegionInput {
        RegionInput {
            code: code.to_string(),
            admin: admin.as_bytes().to_vec(),
            islands: br#"{"elements": [
                {"type": "way", "id": 50, "geometry": [
                    {"lat": 34.0, "lon": 139.0}, {"lat": 34.0, "lon": 139.1},
                    {"lat": 34.1, "lon": 139.1}, {"lat": 34.0, "lon": 139.0}]},
                {"type": "relation", "id": 51, "tags": {"place": "island"},
                 "members": [{"type": "way", "ref": 50, "role": "outer"}]}
            ]}"#
            .to_vec(),
            coastline: br#"{"elements": [
                {"type": "way", "id": 60, "tags": {"natural": "coastline"},
                 "geometry": [{"lat": 35.5, "lon": 139.5}, {"lat": 35.5, "lon": 139.7}]}
            ]}"#
            .to_vec(),
        }
    }

    const ADMIN: &str = r#"{"elements": [
        {"type": "way", "id": 1, "geometry": [{"lat": 0, "lon": 0}, {"lat": 0, "lon": 1}]},
        {"type": "way", "id": 2, "geometry": [{"lat": 0, "lon": 1}, {"lat": 1, "lon": 1}]},
        {"type": "way", "id": 3, "geometry": [{"lat": 1, "lon": 1}, {"lat": 0, "lon": 0}]},
        {"type": "relation", "id": 10, "tags": {"name": "Sample", "admin_level": "7"},
         "members": [{"type": "way", "ref": 1, "role": "outer"},
                     {"type": "way", "ref": 2, "role": "outer"},
                     {"type": "way", "ref": 3, "role": "outer"}]}
    ]}"#;

    #[test]
    fn test_process_region_merges_admin_and_islands() {
        let region = process_region(&input("JP-13", ADMIN)).unwrap();
        assert_eq!(region.boundaries.len(), 2);
        assert_eq!(region.boundaries[0].name(), Some("Sample"));
        // The island relation has no name
        assert_eq!(region.named_boundary_count(), 1);
        assert_eq!(region.coastline.lines.len(), 1);
    }

    #[test]
    fn test_failed_region_does_not_stop_others() {
        let inputs = vec![input("JP-13", ADMIN), input("JP-14", "{}"), input("JP-12", ADMIN)];
        let results = process_regions(&inputs);

        let codes: Vec<&str> = results.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(codes, vec!["JP-13", "JP-14", "JP-12"]);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(GeoError::MalformedInput(_))));
        assert!(results[2].1.is_ok());
    }
}
