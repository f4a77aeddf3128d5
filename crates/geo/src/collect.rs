//! Whether the current position newly collects an area.

use serde::Serialize;
use std::collections::HashSet;

/// Coastline distance at or under which a visit counts
pub const COLLECTION_THRESHOLD_KM: f64 = 1.0;

/// Outcome of [`reconcile`]. Appending is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub should_collect: bool,
}

/// `true` when `current` is not collected yet and the coastline is within 1 km.
///
/// Pure: calling it again after the caller appended `current` yields `false`.
pub fn reconcile(current: &str, already_collected: &HashSet<String>, distance_km: f64) -> Reconciliation {
    reconcile_with_threshold(current, already_collected, distance_km, COLLECTION_THRESHOLD_KM)
}

/// [`reconcile`] with a configurable distance threshold.
pub fn reconcile_with_threshold(
    current: &str,
    already_collected: &HashSet<String>,
    distance_km: f64,
    threshold_km: f64,
) -> Reconciliation {
    // NaN compares false, so an unknown distance never collects
    Reconciliation {
        should_collect: !already_collected.contains(current) && distance_km <= threshold_km,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_area_near_coast() {
        assert!(reconcile("横須賀市", &set(&[]), 0.3).should_collect);
        assert!(reconcile("横須賀市", &set(&["鎌倉市"]), 1.0).should_collect);
    }

    #[test]
    fn test_too_far_from_coast() {
        assert!(!reconcile("横須賀市", &set(&[]), 1.01).should_collect);
        assert!(!reconcile("横須賀市", &set(&[]), f64::INFINITY).should_collect);
        assert!(!reconcile("横須賀市", &set(&[]), f64::NAN).should_collect);
    }

    #[test]
    fn test_idempotent_after_append() {
        let mut collected = set(&[]);
        let first = reconcile("X", &collected, 0.1);
        assert!(first.should_collect);

        collected.insert("X".to_string());
        for distance in [0.0, 0.1, 0.99, 5.0] {
            assert!(!reconcile("X", &collected, distance).should_collect);
        }
    }

    #[test]
    fn test_custom_threshold() {
        assert!(reconcile_with_threshold("X", &set(&[]), 4.0, 5.0).should_collect);
        assert!(!reconcile_with_threshold("X", &set(&[]), 0.6, 0.5).should_collect);
    }
}
