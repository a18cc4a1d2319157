//! Renderable point cloud derived from a [`PointTable`].
//!
//! A cloud is never patched: every structural edit builds a fresh one from the
//! table and swaps it in. All per-point arrays share one index space.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use shared::RowId;

use crate::error::{CapacityError, EditorError, EditorResult};
use crate::predicted::DepthDifference;
use crate::state::selection::Selection;
use crate::state::settings::CloudSettings;
use crate::table::PointTable;
use crate::viewport::picking::Aabb;

/// Scalar array driving point colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarChannel {
    #[default]
    Depth,
    DepthDifference,
    MlScore,
    LineIndex,
}

impl ScalarChannel {
    /// Display toggle order: depth, difference, score, back to depth.
    pub fn next(self) -> Self {
        match self {
            ScalarChannel::Depth => ScalarChannel::DepthDifference,
            ScalarChannel::DepthDifference => ScalarChannel::MlScore,
            ScalarChannel::MlScore | ScalarChannel::LineIndex => ScalarChannel::Depth,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScalarChannel::Depth => "Depth (m)",
            ScalarChannel::DepthDifference => "Depth difference (m)",
            ScalarChannel::MlScore => "ML score",
            ScalarChannel::LineIndex => "Line index",
        }
    }

    fn slot(self) -> usize {
        match self {
            ScalarChannel::Depth => 0,
            ScalarChannel::DepthDifference => 1,
            ScalarChannel::MlScore => 2,
            ScalarChannel::LineIndex => 3,
        }
    }
}

/// Independent geometric scale per axis, applied when positions are built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisScale {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for AxisScale {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }
}

impl AxisScale {
    pub fn new(x: f64, y: f64, z: f64) -> EditorResult<Self> {
        for (axis, v) in [("x", x), ("y", y), ("z", z)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(EditorError::InvalidArgument(format!(
                    "{axis} scale must be positive, got {v}"
                )));
            }
        }
        Ok(Self { x, y, z })
    }
}

#[derive(Debug, Clone)]
pub struct SceneCloud {
    positions: Vec<DVec3>,
    row_ids: Vec<RowId>,
    depth: Vec<f64>,
    depth_diff: Vec<f64>,
    ml_score: Vec<f64>,
    line_index: Vec<f64>,
    flagged: Vec<bool>,
    ranges: [(f64, f64); 4],
    active: ScalarChannel,
    bounds: Option<Aabb>,
}

fn range_of(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 0.0))
}

impl SceneCloud {
    /// One pass over the table. Rows without a difference value get 0.
    pub fn build(
        table: &PointTable,
        difference: Option<&DepthDifference>,
        settings: &CloudSettings,
        scale: AxisScale,
    ) -> Result<Self, CapacityError> {
        let n = table.len();
        let max = settings.max_points.min(u32::MAX as usize);
        if n > max {
            return Err(CapacityError { count: n, max });
        }

        let mut cloud = Self {
            positions: Vec::with_capacity(n),
            row_ids: Vec::with_capacity(n),
            depth: Vec::with_capacity(n),
            depth_diff: Vec::with_capacity(n),
            ml_score: Vec::with_capacity(n),
            line_index: Vec::with_capacity(n),
            flagged: Vec::with_capacity(n),
            ranges: [(0.0, 0.0); 4],
            active: ScalarChannel::default(),
            bounds: None,
        };

        for row in table.rows() {
            cloud.positions.push(DVec3::new(
                row.lon * scale.x,
                row.lat * scale.y,
                row.depth / settings.depth_divisor * scale.z,
            ));
            cloud.row_ids.push(row.row_id);
            cloud.depth.push(row.depth);
            cloud
                .depth_diff
                .push(difference.and_then(|d| d.get(row.row_id)).unwrap_or(0.0));
            cloud.ml_score.push(row.ml_score);
            cloud.line_index.push(row.row_id.0 as f64);
            cloud.flagged.push(row.is_flagged());
        }

        cloud.ranges = [
            range_of(&cloud.depth),
            range_of(&cloud.depth_diff),
            range_of(&cloud.ml_score),
            range_of(&cloud.line_index),
        ];
        cloud.bounds = Aabb::from_points(&cloud.positions);

        tracing::debug!("built cloud: {} points", n);
        Ok(cloud)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    pub fn flagged(&self) -> &[bool] {
        &self.flagged
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn scalars(&self, channel: ScalarChannel) -> &[f64] {
        match channel {
            ScalarChannel::Depth => &self.depth,
            ScalarChannel::DepthDifference => &self.depth_diff,
            ScalarChannel::MlScore => &self.ml_score,
            ScalarChannel::LineIndex => &self.line_index,
        }
    }

    /// Colour-map range of a channel, `(0, 0)` when empty
    pub fn range(&self, channel: ScalarChannel) -> (f64, f64) {
        self.ranges[channel.slot()]
    }

    pub fn active_channel(&self) -> ScalarChannel {
        self.active
    }

    pub fn set_active_channel(&mut self, channel: ScalarChannel) {
        self.active = channel;
    }

    /// Cloud index of a row id. Row ids are ascending in a built cloud.
    pub fn index_of(&self, id: RowId) -> Option<usize> {
        self.row_ids.binary_search(&id).ok()
    }
}

/// Overlay of the current selection, drawn on top of the cloud.
#[derive(Debug, Clone)]
pub struct Highlight {
    pub selection: Selection,
    pub positions: Vec<DVec3>,
    pub color: [f32; 3],
    pub point_size: f32,
}

impl Highlight {
    pub const COLOR: [f32; 3] = [0.0, 0.0, 0.0];

    /// Selected ids missing from the cloud are dropped.
    pub fn new(cloud: &SceneCloud, selection: Selection, point_size: f32) -> Self {
        let selection: Selection = selection
            .iter()
            .filter(|id| cloud.index_of(*id).is_some())
            .collect();
        let positions = selection
            .iter()
            .filter_map(|id| cloud.index_of(id))
            .map(|i| cloud.positions[i])
            .collect();
        Self {
            selection,
            positions,
            color: Self::COLOR,
            point_size,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_parallel_arrays_match_table() {
        let table = fixtures::scored_table(&[0.1, 0.4, 0.6]);
        let cloud = SceneCloud::build(&table, None, &CloudSettings::default(), AxisScale::default())
            .unwrap();
        assert_eq!(cloud.len(), table.len());
        for ch in [
            ScalarChannel::Depth,
            ScalarChannel::DepthDifference,
            ScalarChannel::MlScore,
            ScalarChannel::LineIndex,
        ] {
            assert_eq!(cloud.scalars(ch).len(), cloud.len());
        }
        assert_eq!(cloud.range(ScalarChannel::MlScore), (0.1, 0.6));
        assert_eq!(cloud.range(ScalarChannel::DepthDifference), (0.0, 0.0));
    }

    #[test]
    fn test_scale_applied_to_positions() {
        let table = fixtures::table_from_points(&[(2.0, 3.0, -5000.0)]);
        let settings = CloudSettings::default();
        let scale = AxisScale::new(2.0, 0.5, 10.0).unwrap();
        let cloud = SceneCloud::build(&table, None, &settings, scale).unwrap();
        assert_eq!(cloud.positions()[0], DVec3::new(4.0, 1.5, -5.0));
    }

    #[test]
    fn test_capacity_guard() {
        let table = fixtures::scored_table(&[0.1, 0.2, 0.3]);
        let settings = CloudSettings {
            max_points: 2,
            ..Default::default()
        };
        let err = SceneCloud::build(&table, None, &settings, AxisScale::default()).unwrap_err();
        assert_eq!(err, CapacityError { count: 3, max: 2 });
    }

    #[test]
    fn test_channel_cycle() {
        let c = ScalarChannel::Depth;
        assert_eq!(c.next(), ScalarChannel::DepthDifference);
        assert_eq!(c.next().next(), ScalarChannel::MlScore);
        assert_eq!(c.next().next().next(), ScalarChannel::Depth);
    }

    #[test]
    fn test_invalid_scale_rejected() {
        assert!(AxisScale::new(0.0, 1.0, 1.0).is_err());
        assert!(AxisScale::new(1.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_highlight_drops_missing_ids() {
        let table = fixtures::scored_table(&[0.1, 0.4]);
        let cloud = SceneCloud::build(&table, None, &CloudSettings::default(), AxisScale::default())
            .unwrap();
        let sel: Selection = [RowId(1), RowId(9)].into_iter().collect();
        let h = Highlight::new(&cloud, sel, 10.0);
        assert_eq!(h.len(), 1);
        assert!(h.selection.contains(RowId(1)));
        assert_eq!(h.color, [0.0, 0.0, 0.0]);
    }
}
