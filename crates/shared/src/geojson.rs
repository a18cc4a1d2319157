//! GeoJSON polygon interchange with the 2D map.
//!
//! On disk positions are `[longitude, latitude]`; everything past this module
//! works in (latitude, longitude) order via [`LatLon`].

use serde::{Deserialize, Serialize};

use crate::LatLon;

/// A GeoJSON position. Altitude, if present, is ignored.
pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub properties: serde_json::Value,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

/// A polygon in (latitude, longitude) order: one exterior ring plus holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<LatLon>,
    #[serde(default)]
    pub holes: Vec<Vec<LatLon>>,
}

impl Polygon {
    pub fn new(exterior: Vec<LatLon>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }
}

fn ring_from_positions(ring: &[Position]) -> Result<Vec<LatLon>, String> {
    ring.iter()
        .map(|p| match p.as_slice() {
            [lon, lat, ..] => Ok(LatLon::new(*lat, *lon)),
            _ => Err(format!("position has {} coordinates, expected 2", p.len())),
        })
        .collect()
}

fn ring_to_positions(ring: &[LatLon]) -> Vec<Position> {
    let mut out: Vec<Position> = ring.iter().map(|p| vec![p.lon, p.lat]).collect();
    // GeoJSON rings are explicitly closed
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            out.push(vec![first.lon, first.lat]);
        }
    }
    out
}

fn polygon_from_rings(rings: &[Vec<Position>]) -> Result<Polygon, String> {
    let (exterior, holes) = rings
        .split_first()
        .ok_or_else(|| "polygon has no rings".to_string())?;
    let exterior = ring_from_positions(exterior)?;
    if exterior.len() < 3 {
        return Err(format!(
            "polygon ring has {} positions, expected at least 3",
            exterior.len()
        ));
    }
    let holes = holes
        .iter()
        .map(|h| ring_from_positions(h))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon { exterior, holes })
}

impl FeatureCollection {
    /// Flatten every feature into internal (lat, lon) polygons.
    pub fn polygons(&self) -> Result<Vec<Polygon>, String> {
        let mut out = Vec::new();
        for feature in &self.features {
            match &feature.geometry {
                Geometry::Polygon { coordinates } => out.push(polygon_from_rings(coordinates)?),
                Geometry::MultiPolygon { coordinates } => {
                    for rings in coordinates {
                        out.push(polygon_from_rings(rings)?);
                    }
                }
            }
        }
        Ok(out)
    }

    /// One Polygon feature per polygon, positions written as `[lon, lat]`.
    pub fn from_polygons(polygons: &[Polygon]) -> Self {
        let features = polygons
            .iter()
            .map(|poly| {
                let mut rings = vec![ring_to_positions(&poly.exterior)];
                rings.extend(poly.holes.iter().map(|h| ring_to_positions(h)));
                Feature {
                    kind: "Feature".to_string(),
                    id: None,
                    properties: serde_json::Value::Object(Default::default()),
                    geometry: Geometry::Polygon { coordinates: rings },
                }
            })
            .collect();
        Self {
            kind: "FeatureCollection".to_string(),
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEAFLET_EXPORT: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[10.0, -5.0], [12.0, -5.0], [12.0, -3.0], [10.0, -5.0]]]
            }
        }]
    }"#;

    #[test]
    fn test_axis_order_flipped_on_read() {
        let fc: FeatureCollection = serde_json::from_str(LEAFLET_EXPORT).unwrap();
        let polys = fc.polygons().unwrap();
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].exterior[0], LatLon::new(-5.0, 10.0));
        assert_eq!(polys[0].exterior[2], LatLon::new(-3.0, 12.0));
    }

    #[test]
    fn test_axis_order_flipped_on_write() {
        let poly = Polygon::new(vec![
            LatLon::new(1.0, 2.0),
            LatLon::new(1.0, 3.0),
            LatLon::new(4.0, 3.0),
        ]);
        let fc = FeatureCollection::from_polygons(&[poly]);
        match &fc.features[0].geometry {
            Geometry::Polygon { coordinates } => {
                assert_eq!(coordinates[0][0], vec![2.0, 1.0]);
                // closed ring
                assert_eq!(coordinates[0].len(), 4);
                assert_eq!(coordinates[0][3], vec![2.0, 1.0]);
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_multipolygon_flattens() {
        let json = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":null,
            "geometry":{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,0],[1,1],[0,0]]],
                [[[5,5],[6,5],[6,6],[5,5]]]
            ]}}]}"#;
        let fc: FeatureCollection = serde_json::from_str(json).unwrap();
        assert_eq!(fc.polygons().unwrap().len(), 2);
    }

    #[test]
    fn test_short_position_rejected() {
        let json = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},
            "geometry":{"type":"Polygon","coordinates":[[[0],[1,0],[1,1]]]}}]}"#;
        let fc: FeatureCollection = serde_json::from_str(json).unwrap();
        assert!(fc.polygons().is_err());
    }
}
