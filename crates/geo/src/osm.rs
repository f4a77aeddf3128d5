//! Overpass element model.
//!
//! Overpass `out geom` responses carry way geometry inline as
//! `[{"lat": .., "lon": ..}, ..]`, so a batch is self-contained: no node
//! lookup is needed to build a way's coordinate sequence.

use crate::{GeoError, Position, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Element type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    #[default]
    Node,
    Way,
    Relation,
}

/// A relation member reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(rename = "ref")]
    pub id: i64,
    #[serde(default)]
    pub role: String,
}

/// One node, way or relation of a batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawElement {
    pub kind: ElementKind,
    pub id: i64,
    /// `[lon, lat]` pairs, ways only
    pub coordinates: Vec<Position>,
    pub tags: BTreeMap<String, String>,
    /// Relations only
    pub members: Vec<Member>,
}

impl RawElement {
    /// A way with the given coordinates and no tags.
    pub fn way(id: i64, coordinates: Vec<Position>) -> Self {
        Self {
            kind: ElementKind::Way,
            id,
            coordinates,
            ..Default::default()
        }
    }

    /// A relation referencing the given ways as outer members.
    pub fn relation(id: i64, way_ids: &[i64]) -> Self {
        Self {
            kind: ElementKind::Relation,
            id,
            members: way_ids
                .iter()
                .map(|&id| Member {
                    kind: ElementKind::Way,
                    id,
                    role: "outer".to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn is_way(&self) -> bool {
        self.kind == ElementKind::Way
    }

    pub fn is_relation(&self) -> bool {
        self.kind == ElementKind::Relation
    }
}

#[derive(Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

/// Wire shape of one Overpass element
#[derive(Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: ElementKind,
    id: i64,
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    members: Vec<Member>,
}

impl From<OverpassElement> for RawElement {
    fn from(e: OverpassElement) -> Self {
        RawElement {
            kind: e.kind,
            id: e.id,
            // Overpass emits null for points it could not resolve
            coordinates: e.geometry.into_iter().flatten().map(|p| [p.lon, p.lat]).collect(),
            tags: e.tags,
            members: e.members,
        }
    }
}

/// Decode an Overpass JSON document into elements.
///
/// Fails with [`GeoError::MalformedInput`] when the document is not an
/// object with an `elements` array, or when any element is not an object of
/// the expected shape. No partial result is returned.
pub fn parse_batch(bytes: &[u8]) -> Result<Vec<RawElement>> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| GeoError::malformed(format!("not valid JSON: {}", e)))?;
    parse_value(document)
}

/// Decode an already-parsed Overpass document.
pub fn parse_value(document: Value) -> Result<Vec<RawElement>> {
    let Value::Object(mut root) = document else {
        return Err(GeoError::malformed("batch is not a JSON object"));
    };
    let Some(Value::Array(items)) = root.remove("elements") else {
        return Err(GeoError::malformed("batch has no `elements` array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(GeoError::malformed(format!(
                    "element {} is not an object",
                    index
                )));
            }
            serde_json::from_value::<OverpassElement>(item)
                .map(RawElement::from)
                .map_err(|e| GeoError::malformed(format!("element {}: {}", index, e)))
        })
        .collect()
}

/// Concatenate batches in order (admin boundaries followed by islands).
pub fn merge_batches<I>(batches: I) -> Vec<RawElement>
where
    I: IntoIterator<Item = Vec<RawElement>>,
{
    batches.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_way_and_relation() {
        let batch = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 5, "lat": 35.0, "lon": 139.0},
                {"type": "way", "id": 1, "nodes": [5, 6],
                 "geometry": [{"lat": 35.5, "lon": 139.5}, {"lat": 35.6, "lon": 139.6}],
                 "tags": {"natural": "coastline"}},
                {"type": "relation", "id": 9,
                 "members": [{"type": "way", "ref": 1, "role": "outer"},
                             {"type": "node", "ref": 5, "role": "admin_centre"}],
                 "tags": {"name": "千代田区", "admin_level": "7"}}
            ]
        }"#;

        let elements = parse_batch(batch.as_bytes()).unwrap();
        assert_eq!(elements.len(), 3);

        let way = &elements[1];
        assert!(way.is_way());
        assert_eq!(way.coordinates, vec![[139.5, 35.5], [139.6, 35.6]]);
        assert_eq!(way.tag("natural"), Some("coastline"));

        let relation = &elements[2];
        assert!(relation.is_relation());
        assert_eq!(relation.members.len(), 2);
        assert_eq!(relation.members[1].kind, ElementKind::Node);
        assert_eq!(relation.tag("name"), Some("千代田区"));
    }

    #[test]
    fn test_null_geometry_points_are_skipped() {
        let batch = br#"{"elements": [
            {"type": "way", "id": 1,
             "geometry": [{"lat": 1, "lon": 2}, null, {"lat": 3, "lon": 4}]}
        ]}"#;
        let elements = parse_batch(batch).unwrap();
        assert_eq!(elements[0].coordinates, vec![[2.0, 1.0], [4.0, 3.0]]);
    }

    #[test]
    fn test_missing_elements_is_malformed() {
        let err = parse_batch(br#"{"remark": "runtime error"}"#).unwrap_err();
        assert!(matches!(err, GeoError::MalformedInput(_)));

        let err = parse_batch(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, GeoError::MalformedInput(_)));
    }

    #[test]
    fn test_non_object_element_fails_whole_batch() {
        let batch = br#"{"elements": [
            {"type": "way", "id": 1, "geometry": []},
            "garbage"
        ]}"#;
        let err = parse_batch(batch).unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn test_unknown_element_type_is_malformed() {
        let batch = br#"{"elements": [{"type": "area", "id": 1}]}"#;
        assert!(parse_batch(batch).is_err());
    }

    #[test]
    fn test_merge_keeps_order() {
        let admin = vec![RawElement::way(1, vec![]), RawElement::way(2, vec![])];
        let islands = vec![RawElement::way(3, vec![])];
        let merged = merge_batches([admin, islands]);
        let ids: Vec<i64> = merged.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
