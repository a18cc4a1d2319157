//! ML score partitioning for the 2D map and bulk editing.

use std::collections::BTreeSet;

use serde::Serialize;
use shared::{LatLon, RowId, ScoreClass, ScoreThresholds};

use super::PointTable;

/// Row ids split by score class.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScorePartition {
    pub bad: BTreeSet<RowId>,
    pub uncertain: BTreeSet<RowId>,
    pub good: BTreeSet<RowId>,
}

/// Per-class marker list handed to the map view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapCluster {
    pub class: ScoreClass,
    pub color: &'static str,
    pub points: Vec<LatLon>,
}

impl PointTable {
    pub fn partition(&self, thresholds: &ScoreThresholds) -> ScorePartition {
        let mut out = ScorePartition::default();
        for row in self.rows() {
            let set = match thresholds.classify(row.ml_score) {
                ScoreClass::Bad => &mut out.bad,
                ScoreClass::Uncertain => &mut out.uncertain,
                ScoreClass::Good => &mut out.good,
            };
            set.insert(row.row_id);
        }
        out
    }
}

/// One cluster per class, in bad/uncertain/good order, points in table order.
pub fn map_clusters(table: &PointTable, thresholds: &ScoreThresholds) -> Vec<MapCluster> {
    ScoreClass::all()
        .iter()
        .map(|&class| MapCluster {
            class,
            color: class.color_hex(),
            points: table
                .rows()
                .iter()
                .filter(|r| thresholds.classify(r.ml_score) == class)
                .map(|r| LatLon::new(r.lat, r.lon))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_partition_five_rows() {
        let table = fixtures::scored_table(&[0.1, 0.4, 0.6, 0.9, 0.3]);
        let part = table.partition(&ScoreThresholds::new(0.3, 0.6));
        let cm_ids = |set: &BTreeSet<RowId>| -> Vec<i64> {
            set.iter().map(|id| table.get(*id).unwrap().cm_id).collect()
        };
        assert_eq!(cm_ids(&part.bad), vec![1, 5]);
        assert_eq!(cm_ids(&part.uncertain), vec![2]);
        assert_eq!(cm_ids(&part.good), vec![3, 4]);
    }

    #[test]
    fn test_map_clusters_use_lat_lon_order() {
        let table = fixtures::scored_table(&[0.1, 0.9]);
        let clusters = map_clusters(&table, &ScoreThresholds::default());
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].class, ScoreClass::Bad);
        assert_eq!(clusters[0].color, "#d73027");
        let row = &table.rows()[0];
        assert_eq!(clusters[0].points, vec![LatLon::new(row.lat, row.lon)]);
        assert!(clusters[1].points.is_empty());
        assert_eq!(clusters[2].points.len(), 1);
    }
}
