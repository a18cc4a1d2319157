//! 3D viewport: camera, interaction modes and frame production.

pub mod camera;
pub mod picking;
pub mod selector;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::cloud::ScalarChannel;
use crate::state::session::EditSession;
use crate::state::settings::ViewportSettings;
use camera::{Camera, CameraSnapshot};
use picking::{Aabb, ScreenRect};
use selector::{PickMode, PickTarget, VolumeSelector};

/// Degrees of orbit per pixel dragged
const ROTATE_SPEED: f64 = 0.5;
/// Pan distance per pixel, as a fraction of the focal distance
const PAN_SPEED: f64 = 0.001;
const ZOOM_SPEED: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    /// Orbit in Idle, rubber band in Picking
    Primary,
    /// Pan
    Secondary,
}

/// Actions bound to single keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    TogglePicking,
    DeleteSelection,
    RestoreCamera,
    FlagSelection,
    ToggleChannel,
}

impl KeyAction {
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'r' => Some(KeyAction::TogglePicking),
            'd' => Some(KeyAction::DeleteSelection),
            'c' => Some(KeyAction::RestoreCamera),
            'f' => Some(KeyAction::FlagSelection),
            't' => Some(KeyAction::ToggleChannel),
            _ => None,
        }
    }
}

/// What one rendered frame contained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    pub frame: u64,
    pub points: usize,
    /// Flagged points, drawn black over the channel colours
    pub flagged: usize,
    pub highlighted: usize,
    pub channel: ScalarChannel,
    pub scalar_range: (f64, f64),
    pub point_size: f32,
    /// `None` when the surface is hidden or not built
    pub surface_triangles: Option<usize>,
    pub surface_stale: bool,
    pub predicted_triangles: Option<usize>,
    pub outline: Option<[[f64; 3]; 2]>,
    pub mode: PickMode,
    pub camera: CameraSnapshot,
}

/// Owns the camera and the Idle/Picking switch. Scene content lives in the
/// session and is only read when a frame is produced.
pub struct ViewportController {
    camera: Camera,
    saved: Option<CameraSnapshot>,
    selector: VolumeSelector,
    size: DVec2,
    point_size: f32,
    /// Axis outline box around the cloud
    outline: Option<Aabb>,
    frame: u64,
    last_frame: Option<FrameStats>,
    drag: Option<(PointerButton, DVec2)>,
}

impl ViewportController {
    pub fn new(settings: &ViewportSettings, point_size: f32) -> Self {
        Self {
            camera: Camera::new(settings.view_angle),
            saved: None,
            selector: VolumeSelector::default(),
            size: DVec2::new(settings.width.max(1) as f64, settings.height.max(1) as f64),
            point_size,
            outline: None,
            frame: 0,
            last_frame: None,
            drag: None,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn size(&self) -> DVec2 {
        self.size
    }

    pub fn mode(&self) -> PickMode {
        self.selector.mode()
    }

    pub fn rubber_band(&self) -> Option<ScreenRect> {
        self.selector.rubber_band()
    }

    pub fn outline(&self) -> Option<&Aabb> {
        self.outline.as_ref()
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn set_point_size(&mut self, size: f32) {
        if size.is_finite() && size > 0.0 {
            self.point_size = size;
        }
    }

    pub fn last_frame(&self) -> Option<&FrameStats> {
        self.last_frame.as_ref()
    }

    // ── Interaction ───────────────────────────────────────────

    pub fn toggle_picking(&mut self, target: &mut impl PickTarget) -> PickMode {
        self.drag = None;
        self.selector.toggle(target)
    }

    pub fn pointer_down(&mut self, target: &mut impl PickTarget, button: PointerButton, at: DVec2) {
        if button == PointerButton::Primary && self.selector.begin(target, at) {
            return;
        }
        self.drag = Some((button, at));
    }

    pub fn pointer_move(&mut self, at: DVec2) {
        if self.selector.rubber_band().is_some() {
            self.selector.drag(at);
            return;
        }
        let Some((button, last)) = self.drag else {
            return;
        };
        let delta = at - last;
        match button {
            PointerButton::Primary => {
                self.camera.azimuth(-delta.x * ROTATE_SPEED);
                self.camera.elevation(delta.y * ROTATE_SPEED);
            }
            PointerButton::Secondary => {
                let k = self.camera.distance() * PAN_SPEED;
                self.camera.pan(-delta.x * k, delta.y * k);
            }
        }
        self.drag = Some((button, at));
    }

    /// Returns the number of picked points when a rubber band was completed.
    pub fn pointer_up(&mut self, target: &mut impl PickTarget, at: DVec2) -> Option<usize> {
        self.drag = None;
        self.selector.end(target, &self.camera, self.size, at)
    }

    /// Wheel notches, positive toward the scene.
    pub fn scroll(&mut self, delta: f64) {
        self.camera.dolly(1.0 + delta * ZOOM_SPEED);
    }

    // ── Camera state ──────────────────────────────────────────

    pub fn save_camera(&mut self) -> CameraSnapshot {
        let snap = self.camera.snapshot();
        self.saved = Some(snap);
        snap
    }

    /// Back to the last saved view. False when nothing was saved.
    pub fn restore_camera(&mut self) -> bool {
        match self.saved {
            Some(snap) => {
                self.camera.restore(&snap);
                true
            }
            None => false,
        }
    }

    /// Run a structural rebuild with the camera saved before and restored after,
    /// whatever `f` returns.
    pub fn preserve_camera<R>(&mut self, f: impl FnOnce() -> R) -> R {
        self.save_camera();
        let out = f();
        self.restore_camera();
        out
    }

    /// Frame the whole cloud.
    pub fn reset_camera(&mut self, bounds: Option<Aabb>) {
        if let Some(bounds) = bounds {
            self.camera.reset_to_bounds(&bounds);
        } else {
            self.camera = Camera::new(self.camera.view_angle);
        }
    }

    pub fn update_outline(&mut self, bounds: Option<Aabb>) {
        self.outline = bounds;
    }

    /// Produce a frame from the session. Never moves the camera.
    pub fn render(&mut self, session: &EditSession) -> FrameStats {
        self.frame += 1;
        let (points, flagged, channel, scalar_range) = match session.cloud() {
            Some(cloud) => (
                cloud.len(),
                cloud.flagged().iter().filter(|&&f| f).count(),
                cloud.active_channel(),
                cloud.range(cloud.active_channel()),
            ),
            None => (0, 0, session.channel(), (0.0, 0.0)),
        };
        let visible_triangles = |state: &crate::surface::MeshState| {
            state
                .mesh()
                .filter(|_| state.is_visible())
                .map(|m| m.triangle_count())
        };
        let stats = FrameStats {
            frame: self.frame,
            points,
            flagged,
            highlighted: session.highlight().map_or(0, |h| h.len()),
            channel,
            scalar_range,
            point_size: self.point_size,
            surface_triangles: visible_triangles(session.surface()),
            surface_stale: session.surface().is_stale(),
            predicted_triangles: session.predicted().and_then(|p| visible_triangles(p.mesh())),
            outline: self
                .outline
                .map(|b| [b.min.to_array(), b.max.to_array()]),
            mode: self.selector.mode(),
            camera: self.camera.snapshot(),
        };
        tracing::trace!("frame {}: {} points", stats.frame, stats.points);
        self.last_frame = Some(stats.clone());
        stats
    }

    /// Pixel position of a world point under the current camera.
    pub fn to_screen(&self, world: DVec3) -> Option<DVec2> {
        self.camera.project(world, self.size)
    }
}
