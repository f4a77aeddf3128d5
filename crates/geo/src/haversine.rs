//! Great-circle and equirectangular distances.
//!
//! The proximity engine measures in a local equirectangular plane; these
//! helpers give the spherical reference the planar numbers are checked
//! against.

use crate::Coordinate;

/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometers.
///
/// # Example
/// ```
/// use coastwalk_geo::{haversine_distance, Coordinate};
///
/// let tokyo = Coordinate::new(35.6812, 139.7671);
/// let osaka = Coordinate::new(34.7025, 135.4959);
///
/// let distance = haversine_distance(&tokyo, &osaka);
/// assert!((distance - 403.0).abs() < 5.0);
/// ```
#[inline]
pub fn haversine_distance(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_KM)
}

#[inline]
fn haversine_distance_with_radius(from: &Coordinate, to: &Coordinate, radius: f64) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    radius * c
}
