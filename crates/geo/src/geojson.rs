//! GeoJSON documents exchanged with the geometry store.
//!
//! Boundaries are a `FeatureCollection` of `Polygon`/`MultiPolygon`
//! features; a coastline is a single `Feature` whose geometry is a
//! `MultiLineString`.

use crate::assemble::{PolygonFeature, PolygonRings};
use crate::coastline::CoastlineGeometry;
use crate::{GeoError, Position, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// GeoJSON geometry object (the subset this pipeline produces).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: BTreeMap<String, Value>,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl PolygonFeature {
    pub fn to_feature(&self) -> Feature {
        let rings = |p: &PolygonRings| {
            std::iter::once(p.exterior.clone())
                .chain(p.interiors.iter().cloned())
                .collect::<Vec<_>>()
        };

        let geometry = match self.polygons.as_slice() {
            [single] => Geometry::Polygon {
                coordinates: rings(single),
            },
            many => Geometry::MultiPolygon {
                coordinates: many.iter().map(rings).collect(),
            },
        };

        Feature {
            properties: self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
            geometry: Some(geometry),
        }
    }

    /// Read a polygon feature back; non-string property values are kept as
    /// their JSON text, nulls are dropped.
    pub fn from_feature(feature: Feature) -> Result<Self> {
        let polygons = match feature.geometry {
            Some(Geometry::Polygon { coordinates }) => vec![rings_to_polygon(coordinates)?],
            Some(Geometry::MultiPolygon { coordinates }) => coordinates
                .into_iter()
                .map(rings_to_polygon)
                .collect::<Result<_>>()?,
            other => {
                return Err(GeoError::UnexpectedGeometry {
                    expected: "Polygon or MultiPolygon",
                    found: other.map_or("null", |g| g.type_name()).to_string(),
                })
            }
        };

        let properties = feature
            .properties
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::Null => None,
                Value::String(s) => Some((k, s)),
                other => Some((k, other.to_string())),
            })
            .collect();

        Ok(Self {
            properties,
            polygons,
        })
    }
}

fn rings_to_polygon(mut rings: Vec<Vec<Position>>) -> Result<PolygonRings> {
    if rings.is_empty() {
        return Err(GeoError::UnexpectedGeometry {
            expected: "polygon with an exterior ring",
            found: "empty polygon".to_string(),
        });
    }
    let exterior = rings.remove(0);
    Ok(PolygonRings {
        exterior,
        interiors: rings,
    })
}

impl CoastlineGeometry {
    pub fn to_feature(&self) -> Feature {
        Feature {
            properties: BTreeMap::new(),
            geometry: Some(Geometry::MultiLineString {
                coordinates: self.lines.clone(),
            }),
        }
    }

    pub fn from_feature(feature: Feature) -> Result<Self> {
        match feature.geometry {
            Some(Geometry::MultiLineString { coordinates }) => Ok(Self::new(coordinates)),
            Some(Geometry::LineString { coordinates }) => Ok(Self::new(vec![coordinates])),
            other => Err(GeoError::UnexpectedGeometry {
                expected: "MultiLineString",
                found: other.map_or("null", |g| g.type_name()).to_string(),
            }),
        }
    }
}

/// Boundaries document for a set of polygon features.
pub fn boundaries_document(features: &[PolygonFeature]) -> FeatureCollection {
    FeatureCollection {
        features: features.iter().map(PolygonFeature::to_feature).collect(),
    }
}

/// Polygon features of a boundaries document.
pub fn boundaries_from_document(document: FeatureCollection) -> Result<Vec<PolygonFeature>> {
    document
        .features
        .into_iter()
        .map(PolygonFeature::from_feature)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit_square() -> PolygonFeature {
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), "逗子市".to_string());
        PolygonFeature {
            properties,
            polygons: vec![PolygonRings {
                exterior: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]],
                interiors: vec![],
            }],
        }
    }

    #[test]
    fn test_single_polygon_serializes_as_polygon() {
        let value = serde_json::to_value(unit_square().to_feature()).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "Polygon");
        assert_eq!(value["properties"]["name"], "逗子市");
        assert_eq!(value["geometry"]["coordinates"][0][2], json!([1.0, 1.0]));
    }

    #[test]
    fn test_multi_polygon_feature() {
        let mut feature = unit_square();
        feature.polygons.push(feature.polygons[0].clone());
        let value = serde_json::to_value(feature.to_feature()).unwrap();
        assert_eq!(value["geometry"]["type"], "MultiPolygon");
    }

    #[test]
    fn test_read_upstream_feature_collection() {
        let document: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"name": "葉山町", "admin_level": 8, "note": null},
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
            }]
        }))
        .unwrap();

        let features = boundaries_from_document(document).unwrap();
        assert_eq!(features[0].name(), Some("葉山町"));
        assert_eq!(features[0].properties.get("admin_level").map(String::as_str), Some("8"));
        assert!(!features[0].properties.contains_key("note"));
    }

    #[test]
    fn test_null_properties() {
        let feature: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "properties": null,
            "geometry": {"type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]]]}
        }))
        .unwrap();
        assert!(feature.properties.is_empty());
        let coastline = CoastlineGeometry::from_feature(feature).unwrap();
        assert_eq!(coastline.segment_count(), 1);
    }

    #[test]
    fn test_wrong_geometry_type() {
        let feature = unit_square().to_feature();
        let err = CoastlineGeometry::from_feature(feature).unwrap_err();
        assert!(err.to_string().contains("MultiLineString"));

        let coastline = CoastlineGeometry::new(vec![vec![[0.0, 0.0], [1.0, 1.0]]]);
        assert!(PolygonFeature::from_feature(coastline.to_feature()).is_err());
    }

    #[test]
    fn test_coastline_document_shape() {
        let coastline = CoastlineGeometry::new(vec![vec![[139.5, 35.5], [139.6, 35.5]]]);
        let value = serde_json::to_value(coastline.to_feature()).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["properties"], json!({}));
        assert_eq!(value["geometry"]["type"], "MultiLineString");
    }
}
