//! Headless editor harness for programmatic sessions.
//!
//! Wires an [`EditSession`] to a [`ViewportController`] the way the event loop
//! does: every structural edit runs inside `preserve_camera`, and a load frames
//! the new cloud.

use std::path::Path;

use glam::{DVec2, DVec3};
use shared::{Polygon, ScoreThresholds};

use crate::cloud::{AxisScale, ScalarChannel};
use crate::error::{EditorError, EditorResult};
use crate::state::session::{EditOutcome, EditSession};
use crate::state::settings::AppSettings;
use crate::surface::{GrayBand, SurfaceToggle};
use crate::table::{MapCluster, PointTable, ScorePartition};
use crate::validation::MeshValidator;
use crate::viewport::selector::PickMode;
use crate::viewport::{FrameStats, KeyAction, PointerButton, ViewportController};

/// Headless harness: one optional session plus the viewport driving it
pub struct EditorHarness {
    pub settings: AppSettings,
    pub viewport: ViewportController,
    session: Option<EditSession>,
}

impl EditorHarness {
    /// Create a harness with default settings and no table.
    pub fn new() -> Self {
        Self::with_settings(AppSettings::default())
    }

    pub fn with_settings(settings: AppSettings) -> Self {
        let viewport = ViewportController::new(&settings.viewport, settings.cloud.point_size);
        Self {
            settings,
            viewport,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> EditorResult<&mut EditSession> {
        self.session.as_mut().ok_or(EditorError::NoTable)
    }

    fn loaded(&self) -> EditorResult<&EditSession> {
        self.session.as_ref().ok_or(EditorError::NoTable)
    }

    // ── Loading ───────────────────────────────────────────────

    /// Replace the session and frame the new cloud.
    pub fn load_table(&mut self, table: PointTable) {
        self.install(EditSession::new(table, None, &self.settings));
    }

    /// Load a cm file. On failure the previous session is kept.
    pub fn load_file(&mut self, path: &Path) -> EditorResult<usize> {
        let session = EditSession::open(path, &self.settings)?;
        let rows = session.table().len();
        self.install(session);
        Ok(rows)
    }

    pub fn load_cm_str(&mut self, text: &str) -> EditorResult<usize> {
        let table = PointTable::load_str(text)?;
        let rows = table.len();
        self.load_table(table);
        Ok(rows)
    }

    fn install(&mut self, session: EditSession) {
        let bounds = session.cloud().and_then(|c| c.bounds());
        self.viewport.reset_camera(bounds);
        self.viewport.update_outline(bounds);
        self.viewport.save_camera();
        self.session = Some(session);
    }

    // ── Picking ───────────────────────────────────────────────

    pub fn toggle_picking(&mut self) -> EditorResult<PickMode> {
        let session = self.session.as_mut().ok_or(EditorError::NoTable)?;
        Ok(self.viewport.toggle_picking(session))
    }

    /// Drag a rubber band between two pixel corners. Returns the picked count.
    pub fn pick_rect(&mut self, from: DVec2, to: DVec2) -> EditorResult<usize> {
        let session = self.session.as_mut().ok_or(EditorError::NoTable)?;
        if self.viewport.mode() != PickMode::Picking {
            return Err(EditorError::InvalidArgument(
                "not in picking mode".to_string(),
            ));
        }
        self.viewport.pointer_down(session, PointerButton::Primary, from);
        self.viewport.pointer_move(to);
        Ok(self.viewport.pointer_up(session, to).unwrap_or(0))
    }

    /// Rubber band over a plan-view rectangle given in scene units, at the
    /// depth of the cloud centre.
    pub fn pick_world_rect(&mut self, min: DVec2, max: DVec2) -> EditorResult<usize> {
        let z = self
            .loaded()?
            .cloud()
            .and_then(|c| c.bounds())
            .map_or(0.0, |b| b.center().z);
        let corner = |p: DVec2| {
            self.viewport.to_screen(DVec3::new(p.x, p.y, z)).ok_or_else(|| {
                EditorError::InvalidArgument("rectangle is behind the camera".to_string())
            })
        };
        let a = corner(min)?;
        let b = corner(max)?;
        self.pick_rect(a, b)
    }

    // ── Edits (camera preserved) ──────────────────────────────

    pub fn flag(&mut self) -> EditorResult<EditOutcome> {
        let session = self.session.as_mut().ok_or(EditorError::NoTable)?;
        self.viewport.preserve_camera(|| session.flag())
    }

    pub fn delete(&mut self) -> EditorResult<EditOutcome> {
        let session = self.session.as_mut().ok_or(EditorError::NoTable)?;
        self.viewport.preserve_camera(|| session.delete())
    }

    /// Rescale the axes and refit the outline box to the new extents.
    pub fn rescale(&mut self, x: f64, y: f64, z: f64) -> EditorResult<()> {
        let scale = AxisScale::new(x, y, z)?;
        let session = self.session.as_mut().ok_or(EditorError::NoTable)?;
        self.viewport.preserve_camera(|| session.rescale(scale))?;
        let bounds = session.cloud().and_then(|c| c.bounds());
        self.viewport.update_outline(bounds);
        Ok(())
    }

    pub fn flag_within(&mut self, polygons: &[Polygon]) -> EditorResult<usize> {
        let session = self.session.as_mut().ok_or(EditorError::NoTable)?;
        self.viewport.preserve_camera(|| session.flag_within(polygons))
    }

    /// New score thresholds for the session and for later loads.
    pub fn set_thresholds(&mut self, bad: f64, uncertain: f64) -> EditorResult<ScoreThresholds> {
        let thresholds = ScoreThresholds::new(bad, uncertain);
        thresholds.validate().map_err(EditorError::InvalidArgument)?;
        if let Some(session) = &mut self.session {
            session.set_thresholds(thresholds)?;
        }
        self.settings.thresholds = thresholds;
        Ok(thresholds)
    }

    /// Persist the current settings, to `path` or the platform config directory.
    pub fn save_settings(&self, path: Option<&Path>) -> EditorResult<()> {
        match path {
            Some(path) => self.settings.save_to(path),
            None => {
                self.settings.save();
                Ok(())
            }
        }
    }

    pub fn toggle_channel(&mut self) -> EditorResult<ScalarChannel> {
        Ok(self.session_mut()?.toggle_display_channel())
    }

    pub fn restore_camera(&mut self) -> bool {
        self.viewport.restore_camera()
    }

    pub fn set_point_size(&mut self, size: f32) -> f32 {
        self.viewport.set_point_size(size);
        self.viewport.point_size()
    }

    /// Dispatch a single key press. Unbound keys return `Ok(None)`.
    pub fn key(&mut self, key: char) -> EditorResult<Option<KeyAction>> {
        let Some(action) = KeyAction::from_key(key) else {
            return Ok(None);
        };
        match action {
            KeyAction::TogglePicking => {
                self.toggle_picking()?;
            }
            KeyAction::DeleteSelection => {
                self.delete()?;
            }
            KeyAction::RestoreCamera => {
                self.restore_camera();
            }
            KeyAction::FlagSelection => {
                self.flag()?;
            }
            KeyAction::ToggleChannel => {
                self.toggle_channel()?;
            }
        }
        Ok(Some(action))
    }

    // ── Surfaces and prediction ───────────────────────────────

    pub fn toggle_surface(&mut self) -> EditorResult<SurfaceToggle> {
        self.session_mut()?.toggle_surface()
    }

    pub fn toggle_predicted_surface(&mut self) -> EditorResult<SurfaceToggle> {
        self.session_mut()?.toggle_predicted_surface()
    }

    pub fn set_predicted_band(&mut self, low: f64, high: f64) -> EditorResult<GrayBand> {
        self.session_mut()?.set_predicted_band(low, high)
    }

    pub fn load_prediction_files(&mut self, predicted: &Path, difference: &Path) -> EditorResult<()> {
        let session = self.session.as_mut().ok_or(EditorError::NoTable)?;
        self.viewport
            .preserve_camera(|| session.load_prediction_files(predicted, difference))
    }

    /// Run the configured prediction script next to the loaded cm file.
    pub fn run_prediction(&mut self) -> EditorResult<()> {
        let session = self.session.as_mut().ok_or(EditorError::NoTable)?;
        let job = session.prediction_job()?;
        self.viewport.preserve_camera(|| session.run_prediction(&job))
    }

    /// Validator over the observed surface, if one is built.
    pub fn validate_surface(&self) -> Option<MeshValidator<'_>> {
        self.session()?.surface().mesh().map(MeshValidator::new)
    }

    // ── Output and inspection ─────────────────────────────────

    pub fn save(&self, path: &Path) -> EditorResult<()> {
        self.loaded()?.save(path)
    }

    pub fn export_selection(&self, path: &Path) -> EditorResult<usize> {
        self.loaded()?.export_selection_file(path)
    }

    pub fn partition(&self) -> EditorResult<ScorePartition> {
        Ok(self.loaded()?.partition())
    }

    pub fn map_clusters(&self) -> EditorResult<Vec<MapCluster>> {
        Ok(self.loaded()?.map_clusters())
    }

    pub fn render(&mut self) -> EditorResult<FrameStats> {
        let session = self.session.as_ref().ok_or(EditorError::NoTable)?;
        Ok(self.viewport.render(session))
    }

    /// Number of rows in the table, 0 without a session
    pub fn row_count(&self) -> usize {
        self.session().map_or(0, |s| s.table().len())
    }

    /// Number of highlighted points
    pub fn selected_count(&self) -> usize {
        self.session()
            .and_then(|s| s.highlight())
            .map_or(0, |h| h.len())
    }
}

impl Default for EditorHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn loaded() -> EditorHarness {
        let mut h = EditorHarness::new();
        h.load_table(fixtures::zigzag_table());
        h
    }

    #[test]
    fn test_new_harness_empty() {
        let mut h = EditorHarness::new();
        assert_eq!(h.row_count(), 0);
        assert!(matches!(h.flag(), Err(EditorError::NoTable)));
        assert!(matches!(h.render(), Err(EditorError::NoTable)));
    }

    #[test]
    fn test_failed_load_keeps_previous_session() {
        let mut h = loaded();
        assert!(h.load_cm_str("1 2 3\n").is_err());
        assert_eq!(h.row_count(), 5);
    }

    #[test]
    fn test_pick_requires_picking_mode() {
        let mut h = loaded();
        let err = h.pick_rect(DVec2::ZERO, DVec2::new(10.0, 10.0)).unwrap_err();
        assert!(matches!(err, EditorError::InvalidArgument(_)));
    }

    #[test]
    fn test_pick_world_rect_selects_upper_row() {
        let mut h = loaded();
        h.toggle_picking().unwrap();
        let n = h
            .pick_world_rect(DVec2::new(0.5, 0.5), DVec2::new(3.5, 1.5))
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(h.selected_count(), 2);
    }

    #[test]
    fn test_key_dispatch() {
        let mut h = loaded();
        assert_eq!(h.key('r').unwrap(), Some(KeyAction::TogglePicking));
        assert_eq!(h.viewport.mode(), PickMode::Picking);
        assert_eq!(h.key('t').unwrap(), Some(KeyAction::ToggleChannel));
        assert_eq!(h.session().unwrap().channel(), ScalarChannel::DepthDifference);
        assert_eq!(h.key('q').unwrap(), None);
    }

    #[test]
    fn test_thresholds_apply_to_session_and_settings() {
        let mut h = loaded();
        assert!(h.set_thresholds(0.8, 0.2).is_err());
        h.set_thresholds(0.4, 0.8).unwrap();
        assert_eq!(h.settings.thresholds, ScoreThresholds::new(0.4, 0.8));
        let part = h.partition().unwrap();
        // scores 0.1, 0.3, 0.5, 0.7, 0.9
        assert_eq!(part.bad.len(), 2);
        assert_eq!(part.uncertain.len(), 2);
        assert_eq!(part.good.len(), 1);
    }

    #[test]
    fn test_surface_validates() {
        let mut h = loaded();
        assert!(h.validate_surface().is_none());
        h.toggle_surface().unwrap();
        let errors = h.validate_surface().unwrap().validate_all();
        assert!(errors.is_empty(), "Expected no errors, got: {:?}", errors);
    }
}
