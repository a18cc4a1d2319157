//! Map polygons: GeoJSON interchange and point-in-polygon selection.
//!
//! Rings become closed `kurbo` paths in (lon, lat) plane coordinates. A point
//! is inside when the exterior winds around it and no hole does.

use std::collections::BTreeSet;
use std::path::Path;

use kurbo::{BezPath, Point, Shape};
use shared::{FeatureCollection, LatLon, Polygon, RowId};

use crate::error::{EditorError, EditorResult};
use crate::table::PointTable;

fn ring_path(ring: &[LatLon]) -> BezPath {
    let mut path = BezPath::new();
    let mut points = ring.iter().map(|p| Point::new(p.lon, p.lat));
    if let Some(first) = points.next() {
        path.move_to(first);
        for p in points {
            path.line_to(p);
        }
        path.close_path();
    }
    path
}

/// A polygon prepared for repeated containment tests.
#[derive(Debug, Clone)]
pub struct SelectionPolygon {
    exterior: BezPath,
    holes: Vec<BezPath>,
    bbox: kurbo::Rect,
}

impl SelectionPolygon {
    pub fn new(polygon: &Polygon) -> EditorResult<Self> {
        if polygon.exterior.len() < 3 {
            return Err(EditorError::Polygon(format!(
                "ring has {} vertices, expected at least 3",
                polygon.exterior.len()
            )));
        }
        if polygon
            .exterior
            .iter()
            .chain(polygon.holes.iter().flatten())
            .any(|p| !p.lat.is_finite() || !p.lon.is_finite())
        {
            return Err(EditorError::Polygon("non-finite coordinate".to_string()));
        }
        let exterior = ring_path(&polygon.exterior);
        let bbox = exterior.bounding_box();
        Ok(Self {
            exterior,
            holes: polygon.holes.iter().map(|h| ring_path(h)).collect(),
            bbox,
        })
    }

    pub fn contains(&self, p: LatLon) -> bool {
        let pt = Point::new(p.lon, p.lat);
        if pt.x < self.bbox.x0 || pt.x > self.bbox.x1 || pt.y < self.bbox.y0 || pt.y > self.bbox.y1 {
            return false;
        }
        self.exterior.winding(pt) != 0 && self.holes.iter().all(|h| h.winding(pt) == 0)
    }
}

/// Row ids whose (lat, lon) fall within any of the polygons.
pub fn rows_within(table: &PointTable, polygons: &[Polygon]) -> EditorResult<BTreeSet<RowId>> {
    let prepared = polygons
        .iter()
        .map(SelectionPolygon::new)
        .collect::<EditorResult<Vec<_>>>()?;
    Ok(table
        .rows()
        .iter()
        .filter(|r| {
            let p = LatLon::new(r.lat, r.lon);
            prepared.iter().any(|poly| poly.contains(p))
        })
        .map(|r| r.row_id)
        .collect())
}

pub fn parse_geojson(json: &str) -> EditorResult<Vec<Polygon>> {
    let fc: FeatureCollection =
        serde_json::from_str(json).map_err(|e| EditorError::Polygon(e.to_string()))?;
    fc.polygons().map_err(EditorError::Polygon)
}

pub fn read_geojson(path: &Path) -> EditorResult<Vec<Polygon>> {
    let json = std::fs::read_to_string(path)?;
    parse_geojson(&json)
}

/// Serialize polygons as a FeatureCollection with fresh feature ids.
pub fn to_geojson(polygons: &[Polygon]) -> EditorResult<String> {
    let mut fc = FeatureCollection::from_polygons(polygons);
    for feature in &mut fc.features {
        feature.id = Some(serde_json::Value::String(uuid::Uuid::new_v4().to_string()));
    }
    serde_json::to_string_pretty(&fc).map_err(|e| EditorError::Polygon(e.to_string()))
}

pub fn write_geojson(path: &Path, polygons: &[Polygon]) -> EditorResult<()> {
    std::fs::write(path, to_geojson(polygons)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn square(lat0: f64, lon0: f64, size: f64) -> Vec<LatLon> {
        vec![
            LatLon::new(lat0, lon0),
            LatLon::new(lat0, lon0 + size),
            LatLon::new(lat0 + size, lon0 + size),
            LatLon::new(lat0 + size, lon0),
        ]
    }

    #[test]
    fn test_contains_respects_holes() {
        let poly = Polygon {
            exterior: square(0.0, 0.0, 10.0),
            holes: vec![square(4.0, 4.0, 2.0)],
        };
        let sel = SelectionPolygon::new(&poly).unwrap();
        assert!(sel.contains(LatLon::new(1.0, 1.0)));
        assert!(!sel.contains(LatLon::new(5.0, 5.0)));
        assert!(!sel.contains(LatLon::new(11.0, 1.0)));
    }

    #[test]
    fn test_rows_within_uses_lat_lon() {
        // lon 0..4, lat 0/1 alternating
        let table = fixtures::zigzag_table();
        // lat in [0.5, 1.5], lon in [0, 4.5]: the rows with lat 1
        let poly = Polygon::new(vec![
            LatLon::new(0.5, -0.5),
            LatLon::new(0.5, 4.5),
            LatLon::new(1.5, 4.5),
            LatLon::new(1.5, -0.5),
        ]);
        let ids = rows_within(&table, &[poly]).unwrap();
        assert_eq!(ids, [RowId(1), RowId(3)].into_iter().collect());
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let poly = Polygon::new(vec![LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0)]);
        assert!(SelectionPolygon::new(&poly).is_err());
    }

    #[test]
    fn test_export_then_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polygons.geojson");
        let poly = Polygon::new(square(-5.0, 10.0, 2.0));
        write_geojson(&path, std::slice::from_ref(&poly)).unwrap();
        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"id\""));
        let back = read_geojson(&path).unwrap();
        // closing vertex added on export
        assert_eq!(back[0].exterior.len(), 5);
        assert_eq!(back[0].exterior[..4], poly.exterior[..]);
    }
}
