//! Edit session: sole owner of the point table and its derived scene.
//!
//! Every structural edit follows the same order: mutate a copy of the table,
//! build a new cloud from it, then swap both in. A rescale that cannot be
//! rendered changes nothing. A flag or delete on a table too large to render
//! still lands in the table; the cloud is dropped and `render_error` says why.

mod output;
mod surfaces;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared::{Polygon, RowId, ScoreThresholds, FLAG_EXCLUDED};

pub use surfaces::PredictedLayer;

use super::selection::Selection;
use super::settings::{AppSettings, CloudSettings, PredictedSettings};
use crate::cloud::{AxisScale, Highlight, ScalarChannel, SceneCloud};
use crate::error::{CapacityError, EditorResult};
use crate::predicted::DepthDifference;
use crate::surface::MeshState;
use crate::table::PointTable;
use crate::viewport::selector::PickTarget;

/// Result of a flag or delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EditOutcome {
    /// Nothing was highlighted; the request is a no-op
    NoSelection,
    Applied { rows: usize },
}

pub struct EditSession {
    table: PointTable,
    source: Option<PathBuf>,
    cloud_settings: CloudSettings,
    predicted_settings: PredictedSettings,
    thresholds: ScoreThresholds,
    scale: AxisScale,
    channel: ScalarChannel,
    cloud: Option<SceneCloud>,
    render_error: Option<CapacityError>,
    highlight: Option<Highlight>,
    difference: Option<DepthDifference>,
    surface: MeshState,
    predicted: Option<PredictedLayer>,
    /// Bumped on every swap of table or cloud
    version: u64,
}

impl EditSession {
    /// A table that is too large to render still opens; `render_error` says why.
    pub fn new(table: PointTable, source: Option<PathBuf>, settings: &AppSettings) -> Self {
        let scale = AxisScale::default();
        let (cloud, render_error) = match SceneCloud::build(&table, None, &settings.cloud, scale) {
            Ok(cloud) => (Some(cloud), None),
            Err(e) => {
                tracing::warn!("cloud not rendered: {e}");
                (None, Some(e))
            }
        };
        Self {
            table,
            source,
            cloud_settings: settings.cloud.clone(),
            predicted_settings: settings.predicted.clone(),
            thresholds: settings.thresholds,
            scale,
            channel: ScalarChannel::default(),
            cloud,
            render_error,
            highlight: None,
            difference: None,
            surface: MeshState::default(),
            predicted: None,
            version: 0,
        }
    }

    pub fn open(path: &Path, settings: &AppSettings) -> EditorResult<Self> {
        let table = PointTable::read_file(path)?;
        Ok(Self::new(table, Some(path.to_path_buf()), settings))
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn table(&self) -> &PointTable {
        &self.table
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn cloud(&self) -> Option<&SceneCloud> {
        self.cloud.as_ref()
    }

    pub fn render_error(&self) -> Option<&CapacityError> {
        self.render_error.as_ref()
    }

    pub fn highlight(&self) -> Option<&Highlight> {
        self.highlight.as_ref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.highlight.as_ref().map(|h| &h.selection)
    }

    pub fn scale(&self) -> AxisScale {
        self.scale
    }

    pub fn channel(&self) -> ScalarChannel {
        self.channel
    }

    pub fn thresholds(&self) -> ScoreThresholds {
        self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: ScoreThresholds) -> EditorResult<()> {
        thresholds
            .validate()
            .map_err(crate::error::EditorError::InvalidArgument)?;
        self.thresholds = thresholds;
        Ok(())
    }

    pub fn difference(&self) -> Option<&DepthDifference> {
        self.difference.as_ref()
    }

    pub fn surface(&self) -> &MeshState {
        &self.surface
    }

    pub fn predicted(&self) -> Option<&PredictedLayer> {
        self.predicted.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cloud_settings(&self) -> &CloudSettings {
        &self.cloud_settings
    }

    // ── Rebuild ───────────────────────────────────────────────

    /// New cloud for `table` in the current channel. Touches nothing.
    fn build_cloud(
        &self,
        table: &PointTable,
        scale: AxisScale,
        difference: Option<&DepthDifference>,
    ) -> Result<SceneCloud, CapacityError> {
        let mut cloud = SceneCloud::build(table, difference, &self.cloud_settings, scale)?;
        cloud.set_active_channel(self.channel);
        Ok(cloud)
    }

    /// Swap a fully built cloud in together with the table it came from.
    fn install(&mut self, table: PointTable, scale: AxisScale, cloud: SceneCloud) {
        let point_size = self.cloud_settings.highlight_point_size;
        self.highlight = self
            .highlight
            .take()
            .map(|h| Highlight::new(&cloud, h.selection, point_size));
        self.table = table;
        self.scale = scale;
        self.cloud = Some(cloud);
        self.render_error = None;
        self.surface.invalidate();
        self.version += 1;
        tracing::info!(
            "rebuilt cloud: {} points, channel {:?}",
            self.table.len(),
            self.channel
        );
    }

    /// Swap in an edited table at the current scale, with or without a cloud.
    fn commit_table(&mut self, table: PointTable) {
        match self.build_cloud(&table, self.scale, self.difference.as_ref()) {
            Ok(cloud) => self.install(table, self.scale, cloud),
            Err(e) => {
                tracing::warn!("cloud not rendered: {e}");
                self.table = table;
                self.cloud = None;
                self.highlight = None;
                self.render_error = Some(e);
                self.surface.invalidate();
                self.version += 1;
            }
        }
    }

    // ── Edits ─────────────────────────────────────────────────

    fn take_selection(&self) -> Option<BTreeSet<RowId>> {
        self.highlight
            .as_ref()
            .map(|h| h.selection.row_ids().clone())
    }

    /// Mark every highlighted row as excluded and consume the highlight.
    pub fn flag(&mut self) -> EditorResult<EditOutcome> {
        let Some(ids) = self.take_selection() else {
            tracing::debug!("flag: nothing selected");
            return Ok(EditOutcome::NoSelection);
        };
        let rows = self.flag_rows(&ids)?;
        self.highlight = None;
        Ok(EditOutcome::Applied { rows })
    }

    /// Physically remove every highlighted row and consume the highlight.
    pub fn delete(&mut self) -> EditorResult<EditOutcome> {
        let Some(ids) = self.take_selection() else {
            tracing::debug!("delete: nothing selected");
            return Ok(EditOutcome::NoSelection);
        };
        let before = self.table.len();
        if !ids.is_empty() {
            let table = self.table.delete_rows(&ids);
            self.commit_table(table);
        }
        let rows = before - self.table.len();
        self.highlight = None;
        tracing::info!("deleted {rows} soundings");
        Ok(EditOutcome::Applied { rows })
    }

    /// Flag rows by id regardless of the highlight. Unknown ids are skipped.
    pub fn flag_rows(&mut self, ids: &BTreeSet<RowId>) -> EditorResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut table = self.table.clone();
        let rows = table.apply_flag(ids, FLAG_EXCLUDED);
        self.commit_table(table);
        tracing::info!("flagged {rows} soundings");
        Ok(rows)
    }

    /// Flag every row whose position falls inside one of the map polygons.
    pub fn flag_within(&mut self, polygons: &[Polygon]) -> EditorResult<usize> {
        let ids = crate::polygon::rows_within(&self.table, polygons)?;
        self.flag_rows(&ids)
    }

    /// New axis scale factors; positions are rebuilt from scratch.
    pub fn rescale(&mut self, scale: AxisScale) -> EditorResult<()> {
        let cloud = self.build_cloud(&self.table, scale, self.difference.as_ref())?;
        let table = std::mem::take(&mut self.table);
        self.install(table, scale, cloud);
        if let Some(layer) = &mut self.predicted {
            layer.mesh.invalidate();
        }
        Ok(())
    }

    /// Cycle the colouring channel. Geometry is untouched.
    pub fn toggle_display_channel(&mut self) -> ScalarChannel {
        self.channel = self.channel.next();
        if let Some(cloud) = &mut self.cloud {
            cloud.set_active_channel(self.channel);
        }
        tracing::debug!("display channel: {:?}", self.channel);
        self.channel
    }
}

impl PickTarget for EditSession {
    fn pick_cloud(&self) -> Option<&SceneCloud> {
        self.cloud.as_ref()
    }

    fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    fn commit_selection(&mut self, selection: Selection) {
        let Some(cloud) = &self.cloud else {
            return;
        };
        let highlight = Highlight::new(cloud, selection, self.cloud_settings.highlight_point_size);
        tracing::info!("selected {} points", highlight.len());
        self.highlight = Some(highlight);
    }
}
