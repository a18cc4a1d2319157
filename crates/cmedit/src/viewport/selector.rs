//! Rubber-band volume selection.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::picking::{select_in_frustum, Frustum, ScreenRect};
use crate::cloud::SceneCloud;
use crate::state::selection::Selection;

/// Interaction mode of the viewport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickMode {
    /// Mouse drags move the camera
    #[default]
    Idle,
    /// Mouse drags draw a selection rectangle
    Picking,
}

/// What the selector may do to its owner's scene.
pub trait PickTarget {
    fn pick_cloud(&self) -> Option<&SceneCloud>;
    fn clear_highlight(&mut self);
    fn commit_selection(&mut self, selection: Selection);
}

#[derive(Debug, Clone, Default)]
pub struct VolumeSelector {
    mode: PickMode,
    anchor: Option<DVec2>,
    current: Option<DVec2>,
}

impl VolumeSelector {
    pub fn mode(&self) -> PickMode {
        self.mode
    }

    pub fn is_picking(&self) -> bool {
        self.mode == PickMode::Picking
    }

    /// Switch modes. Leaving Picking drops the highlight and any drag in progress.
    pub fn toggle(&mut self, target: &mut impl PickTarget) -> PickMode {
        self.mode = match self.mode {
            PickMode::Idle => PickMode::Picking,
            PickMode::Picking => {
                target.clear_highlight();
                PickMode::Idle
            }
        };
        self.anchor = None;
        self.current = None;
        tracing::debug!("pick mode: {:?}", self.mode);
        self.mode
    }

    /// Button down. Returns false when not picking.
    pub fn begin(&mut self, target: &mut impl PickTarget, at: DVec2) -> bool {
        if !self.is_picking() {
            return false;
        }
        target.clear_highlight();
        self.anchor = Some(at);
        self.current = Some(at);
        true
    }

    pub fn drag(&mut self, at: DVec2) {
        if self.anchor.is_some() {
            self.current = Some(at);
        }
    }

    /// Rectangle currently being drawn.
    pub fn rubber_band(&self) -> Option<ScreenRect> {
        Some(ScreenRect::from_corners(self.anchor?, self.current?))
    }

    /// Button up: select everything inside the rectangle's frustum and
    /// hand it to the target. None when no drag was in progress.
    pub fn end(
        &mut self,
        target: &mut impl PickTarget,
        camera: &Camera,
        size: DVec2,
        at: DVec2,
    ) -> Option<usize> {
        let anchor = self.anchor.take()?;
        self.current = None;
        let rect = ScreenRect::from_corners(anchor, at);
        let selection = match target.pick_cloud() {
            Some(cloud) => {
                let frustum = Frustum::from_screen_rect(camera, size, rect);
                select_in_frustum(cloud, &frustum)
            }
            None => Selection::default(),
        };
        let count = selection.len();
        tracing::debug!(
            "rubber band {:.0}x{:.0} px picked {count} points",
            rect.width(),
            rect.height()
        );
        target.commit_selection(selection);
        Some(count)
    }
}
