//! Relation → polygon assembly.
//!
//! Relation members are usually unordered fragments of a boundary. Each
//! relation's member ways are chained end to end (a way may be walked in
//! reverse) until the chain returns to its starting point. Chains that never
//! close, and closed rings that enclose no area, are discarded.
//!
//! Rings of `inner` members become holes of the first outer ring that
//! contains them; every other role is treated as outer.

use crate::osm::{ElementKind, RawElement};
use crate::{Coordinate, GeoError, Position, Result};
use geo::{Area, Contains, Coord, Intersects, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A closed coordinate loop (first position equals last).
pub type Ring = Vec<Position>;

/// One polygon: an exterior ring and its holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRings {
    pub exterior: Ring,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interiors: Vec<Ring>,
}

impl PolygonRings {
    pub fn to_geo(&self) -> Polygon<f64> {
        Polygon::new(
            to_line_string(&self.exterior),
            self.interiors.iter().map(|r| to_line_string(r)).collect(),
        )
    }
}

/// An assembled boundary: one source relation's tags and rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonFeature {
    pub properties: BTreeMap<String, String>,
    pub polygons: Vec<PolygonRings>,
}

impl PolygonFeature {
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").map(String::as_str)
    }

    /// Every ring, exteriors and holes.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.polygons
            .iter()
            .flat_map(|p| std::iter::once(&p.exterior).chain(p.interiors.iter()))
    }

    /// Enclosed planar area in square degrees.
    pub fn area(&self) -> f64 {
        self.to_geo().unsigned_area()
    }

    pub fn to_geo(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.polygons.iter().map(PolygonRings::to_geo).collect())
    }

    /// Whether the point lies inside or on the boundary of this feature.
    pub fn contains(&self, point: &Coordinate) -> bool {
        let point = Point::new(point.longitude, point.latitude);
        self.polygons.iter().any(|p| p.to_geo().intersects(&point))
    }
}

/// Way id → coordinate sequence, for ways with at least two points.
pub struct WayIndex<'a> {
    ways: HashMap<i64, &'a [Position]>,
}

impl<'a> WayIndex<'a> {
    /// Index every usable way of a batch.
    ///
    /// A way with a non-finite coordinate makes the batch malformed.
    pub fn build(elements: &'a [RawElement]) -> Result<Self> {
        let mut ways = HashMap::new();
        for element in elements.iter().filter(|e| e.is_way()) {
            if let Some(bad) = element
                .coordinates
                .iter()
                .find(|p| !p[0].is_finite() || !p[1].is_finite())
            {
                return Err(GeoError::MalformedInput(format!(
                    "way {} has a non-finite coordinate {:?}",
                    element.id, bad
                )));
            }
            if element.coordinates.len() >= 2 {
                ways.insert(element.id, element.coordinates.as_slice());
            }
        }
        Ok(Self { ways })
    }

    pub fn get(&self, id: i64) -> Option<&'a [Position]> {
        self.ways.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.ways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ways.is_empty()
    }
}

/// Assemble every relation of a batch into polygon features.
///
/// Output order follows relation order in the input. A relation whose member
/// ways are all missing, or whose ways never close into a ring with area,
/// produces no feature; that is logged, not an error.
pub fn assemble(elements: &[RawElement]) -> Result<Vec<PolygonFeature>> {
    let index = WayIndex::build(elements)?;
    let mut features = Vec::new();
    let mut dropped = 0usize;

    for relation in elements.iter().filter(|e| e.is_relation()) {
        let way_members: Vec<_> = relation
            .members
            .iter()
            .filter(|m| m.kind == ElementKind::Way)
            .collect();
        if way_members.is_empty() {
            continue;
        }

        let mut outer = Vec::new();
        let mut inner = Vec::new();
        for member in &way_members {
            if let Some(coords) = index.get(member.id) {
                if member.role == "inner" {
                    inner.push(coords);
                } else {
                    outer.push(coords);
                }
            }
        }

        if outer.is_empty() && inner.is_empty() {
            debug!(relation_id = relation.id, "no member ways present in batch");
            dropped += 1;
            continue;
        }

        match build_polygons(&outer, &inner) {
            Some(polygons) => features.push(PolygonFeature {
                properties: relation.tags.clone(),
                polygons,
            }),
            None => {
                debug!(
                    relation_id = relation.id,
                    ways = outer.len() + inner.len(),
                    "member ways did not close into any ring"
                );
                dropped += 1;
            }
        }
    }

    debug!(
        ways = index.len(),
        features = features.len(),
        dropped,
        "assembled batch"
    );
    Ok(features)
}

fn build_polygons(outer: &[&[Position]], inner: &[&[Position]]) -> Option<Vec<PolygonRings>> {
    let mut exteriors: Vec<Ring> = stitch(outer).into_iter().filter(|r| ring_area(r) > 0.0).collect();
    let mut holes: Vec<Ring> = stitch(inner).into_iter().filter(|r| ring_area(r) > 0.0).collect();

    // Relations tagged only with inner members still describe an area
    if exteriors.is_empty() {
        exteriors = std::mem::take(&mut holes);
    }
    if exteriors.is_empty() {
        return None;
    }

    let mut polygons: Vec<PolygonRings> = exteriors
        .into_iter()
        .map(|exterior| PolygonRings {
            exterior,
            interiors: Vec::new(),
        })
        .collect();

    for hole in holes {
        let probe = Point::new(hole[0][0], hole[0][1]);
        if let Some(owner) = polygons
            .iter_mut()
            .find(|p| Polygon::new(to_line_string(&p.exterior), vec![]).contains(&probe))
        {
            owner.interiors.push(hole);
        }
    }

    Some(polygons)
}

/// Chain segments into closed rings by matching shared endpoints.
///
/// Dangling segments (an endpoint no other segment touches) never take part
/// in a walk, and the ways of a chain that fails to close are released for
/// later starts. The result does not depend on member order.
pub fn stitch(segments: &[&[Position]]) -> Vec<Ring> {
    let mut endpoints: HashMap<PointKey, Vec<(usize, bool)>> = HashMap::new();
    for (idx, seg) in segments.iter().enumerate() {
        if let (Some(&first), Some(&last)) = (seg.first(), seg.last()) {
            endpoints.entry(key(first)).or_default().push((idx, true));
            endpoints.entry(key(last)).or_default().push((idx, false));
        }
    }

    let mut used = prune_dangles(segments, &endpoints);
    let mut rings = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }

        let mut ring: Ring = Vec::new();
        let mut chain = Vec::new();
        let mut current = start;
        let mut forward = true;

        loop {
            used[current] = true;
            chain.push(current);
            let seg = segments[current];
            // Shared endpoint already in the ring
            let skip = usize::from(!ring.is_empty());
            if forward {
                ring.extend(seg.iter().skip(skip).copied());
            } else {
                ring.extend(seg.iter().rev().skip(skip).copied());
            }

            if is_closed(&ring) {
                break;
            }

            let Some(&tail) = ring.last() else { break };
            let next = endpoints
                .get(&key(tail))
                .and_then(|candidates| candidates.iter().find(|(idx, _)| !used[*idx]))
                .copied();

            match next {
                Some((idx, is_start)) => {
                    current = idx;
                    forward = is_start;
                }
                None => break,
            }
        }

        if is_closed(&ring) {
            rings.push(ring);
        } else {
            // Only the start stays consumed, so every start is walked once
            for idx in chain.into_iter().skip(1) {
                used[idx] = false;
            }
        }
    }

    rings
}

/// Mark segments hanging off the network by a free end, repeatedly, so
/// spurs and chains of spurs are all excluded.
fn prune_dangles(segments: &[&[Position]], endpoints: &HashMap<PointKey, Vec<(usize, bool)>>) -> Vec<bool> {
    let mut degree: HashMap<PointKey, usize> = endpoints.iter().map(|(k, v)| (*k, v.len())).collect();
    let mut pruned = vec![false; segments.len()];

    loop {
        let mut changed = false;
        for (idx, seg) in segments.iter().enumerate() {
            if pruned[idx] {
                continue;
            }
            let (Some(&first), Some(&last)) = (seg.first(), seg.last()) else {
                pruned[idx] = true;
                continue;
            };
            let (a, b) = (key(first), key(last));
            if a == b {
                continue;
            }
            let free_end = |k: &PointKey| degree.get(k).copied().unwrap_or(0) < 2;
            if free_end(&a) || free_end(&b) {
                pruned[idx] = true;
                for k in [a, b] {
                    if let Some(d) = degree.get_mut(&k) {
                        *d = d.saturating_sub(1);
                    }
                }
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    pruned
}

type PointKey = (u64, u64);

fn key(p: Position) -> PointKey {
    // + 0.0 folds -0.0 into 0.0
    ((p[0] + 0.0).to_bits(), (p[1] + 0.0).to_bits())
}

fn is_closed(ring: &[Position]) -> bool {
    ring.len() >= 4 && ring.first().map(|&p| key(p)) == ring.last().map(|&p| key(p))
}

fn to_line_string(ring: &[Position]) -> LineString<f64> {
    LineString::new(ring.iter().map(|p| Coord { x: p[0], y: p[1] }).collect())
}

fn ring_area(ring: &[Position]) -> f64 {
    Polygon::new(to_line_string(ring), vec![]).unsigned_area()
}
