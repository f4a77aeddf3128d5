//! Geometry pipeline for coastwalk.
//!
//! This crate provides:
//! - Overpass element parsing ([`osm`])
//! - Stitching relation member ways into polygons ([`assemble()`])
//! - Collecting coastline ways into one multi-line geometry ([`linearize()`])
//! - Point-in-polygon and point-to-coastline distance queries ([`proximity`])
//! - The collected-area decision ([`reconcile()`])
//! - GeoJSON documents, prefecture tables and built-in sample data
//! - Batch processing of regions with optional parallelism
//!
//! # Example
//!
//! ```
//! use coastwalk_geo::{assemble, locate, osm::parse_batch, Coordinate};
//!
//! let batch = br#"{"elements": [
//!   {"type": "way", "id": 1, "geometry": [{"lat": 0, "lon": 0}, {"lat": 0, "lon": 1}]},
//!   {"type": "way", "id": 2, "geometry": [{"lat": 0, "lon": 1}, {"lat": 1, "lon": 1}]},
//!   {"type": "way", "id": 3, "geometry": [{"lat": 1, "lon": 1}, {"lat": 0, "lon": 0}]},
//!   {"type": "relation", "id": 10, "tags": {"name": "Sample"},
//!    "members": [{"type": "way", "ref": 1, "role": "outer"},
//!                {"type": "way", "ref": 2, "role": "outer"},
//!                {"type": "way", "ref": 3, "role": "outer"}]}
//! ]}"#;
//!
//! let elements = parse_batch(batch).unwrap();
//! let polygons = assemble(&elements).unwrap();
//! assert_eq!(polygons[0].name(), Some("Sample"));
//!
//! let inside = Coordinate::new(0.2, 0.7);
//! assert!(locate(&inside, &polygons).is_some());
//! ```

pub mod assemble;
pub mod batch;
pub mod coastline;
pub mod collect;
mod error;
pub mod geojson;
mod haversine;
pub mod osm;
pub mod proximity;
pub mod region;
pub mod sample;

pub use assemble::{assemble, PolygonFeature, PolygonRings, Ring};
pub use batch::{process_region, process_regions, ProcessedRegion, RegionInput};
pub use coastline::{linearize, CoastlineGeometry};
pub use collect::{reconcile, reconcile_with_threshold, Reconciliation, COLLECTION_THRESHOLD_KM};
pub use error::{GeoError, GeoErrorCode, Result};
pub use haversine::{haversine_distance, EARTH_RADIUS_KM};
pub use osm::{ElementKind, Member, RawElement};
pub use proximity::{distance_to_nearest, distance_to_nearest_exact, locate, ProximityConfig};
pub use region::{BoundaryLookup, RectBoundaryLookup, HOME_REGION};

/// A GeoJSON position: `[longitude, latitude]`.
pub type Position = [f64; 2];

/// A geographic coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    ///
    /// # Arguments
    /// * `latitude` - Latitude in degrees (-90 to 90)
    /// * `longitude` - Longitude in degrees (-180 to 180)
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Creates a coordinate from a GeoJSON `[lon, lat]` position.
    #[inline]
    pub fn from_position(position: Position) -> Self {
        Self::new(position[1], position[0])
    }

    /// The GeoJSON `[lon, lat]` position of this coordinate.
    #[inline]
    pub fn to_position(&self) -> Position {
        [self.longitude, self.latitude]
    }

    /// Returns true if the coordinate has valid values.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Converts degrees to radians for internal calculations.
    #[inline]
    pub(crate) fn to_radians(&self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}
