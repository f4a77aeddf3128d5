//! Coastline ways → one multi-line geometry.

use crate::osm::RawElement;
use crate::Position;
use serde::{Deserialize, Serialize};

/// Ordered coastline segments, each exactly as one upstream way reported it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoastlineGeometry {
    pub lines: Vec<Vec<Position>>,
}

impl CoastlineGeometry {
    pub fn new(lines: Vec<Vec<Position>>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of point-to-point segments across all lines.
    pub fn segment_count(&self) -> usize {
        self.lines.iter().map(|l| l.len().saturating_sub(1)).sum()
    }

    /// Every segment in line order.
    pub fn segments(&self) -> impl Iterator<Item = (Position, Position)> + '_ {
        self.lines
            .iter()
            .flat_map(|line| line.windows(2).map(|w| (w[0], w[1])))
    }

    /// Append another geometry's lines after this one's.
    pub fn extend(&mut self, other: CoastlineGeometry) {
        self.lines.extend(other.lines);
    }
}

/// Only ways tagged `natural=coastline` count; recursion in the query pulls
/// in untagged nodes, never untagged ways.
fn is_coastline(element: &RawElement) -> bool {
    element.is_way() && element.tag("natural") == Some("coastline")
}

/// Collect every coastline way with at least two points, in input order.
pub fn linearize(elements: &[RawElement]) -> CoastlineGeometry {
    CoastlineGeometry {
        lines: elements
            .iter()
            .filter(|e| is_coastline(e) && e.coordinates.len() >= 2)
            .map(|e| e.coordinates.clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coast(id: i64, coords: Vec<Position>) -> RawElement {
        RawElement::way(id, coords).with_tag("natural", "coastline")
    }

    #[test]
    fn test_preserves_order_and_coordinates() {
        let elements = vec![
            coast(2, vec![[139.7, 35.5], [139.8, 35.5]]),
            coast(1, vec![[139.5, 35.5], [139.6, 35.5], [139.65, 35.52]]),
        ];

        let geometry = linearize(&elements);
        assert_eq!(geometry.lines.len(), 2);
        assert_eq!(geometry.lines[0], vec![[139.7, 35.5], [139.8, 35.5]]);
        assert_eq!(geometry.lines[1].len(), 3);
        assert_eq!(geometry.segment_count(), 3);
    }

    #[test]
    fn test_filters_short_and_non_coastline_ways() {
        let elements = vec![
            coast(1, vec![[0.0, 0.0]]),
            RawElement::way(2, vec![[0.0, 0.0], [1.0, 1.0]]).with_tag("highway", "primary"),
            RawElement::relation(3, &[1]),
            coast(4, vec![[2.0, 2.0], [3.0, 3.0]]),
        ];

        let geometry = linearize(&elements);
        assert_eq!(geometry.lines.len(), 1);
        assert_eq!(geometry.lines[0], vec![[2.0, 2.0], [3.0, 3.0]]);
    }

    #[test]
    fn test_untagged_ways_are_not_coastline() {
        let elements = vec![
            coast(1, vec![[139.5, 35.5], [139.6, 35.5]]),
            RawElement::way(2, vec![[139.6, 35.5], [139.7, 35.5]]),
        ];

        let geometry = linearize(&elements);
        assert_eq!(geometry.lines.len(), 1);
        assert_eq!(geometry.segment_count(), 1);
    }

    #[test]
    fn test_empty_batch_is_empty_geometry() {
        assert!(linearize(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn output_matches_qualifying_ways(lengths in proptest::collection::vec(0usize..5, 0..20)) {
            let elements: Vec<RawElement> = lengths
                .iter()
                .enumerate()
                .map(|(i, &n)| coast(i as i64, (0..n).map(|k| [k as f64, i as f64]).collect()))
                .collect();

            let geometry = linearize(&elements);
            let expected: Vec<i64> = elements
                .iter()
                .filter(|e| e.coordinates.len() >= 2)
                .map(|e| e.id)
                .collect();

            prop_assert_eq!(geometry.lines.len(), expected.len());
            for (line, id) in geometry.lines.iter().zip(expected) {
                prop_assert_eq!(line[0][1], id as f64);
            }
        }
    }
}
