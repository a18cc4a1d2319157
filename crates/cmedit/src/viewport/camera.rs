use glam::{DMat4, DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use super::picking::Aabb;

/// Scene camera. Field set mirrors what an edit must preserve.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: DVec3,
    pub focal_point: DVec3,
    pub view_up: DVec3,
    /// Vertical field of view (degrees)
    pub view_angle: f64,
    pub parallel_projection: bool,
    /// Half height of the view in world units when parallel
    pub parallel_scale: f64,
    /// Near and far clip distances from the camera
    pub clip_range: (f64, f64),
}

/// Plain copy of every camera field, compared bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub position: [f64; 3],
    pub focal_point: [f64; 3],
    pub view_up: [f64; 3],
    pub view_angle: f64,
    pub parallel_projection: bool,
    pub parallel_scale: f64,
    pub clip_range: [f64; 2],
}

impl Camera {
    /// Looking down -z at the origin
    pub fn new(view_angle: f64) -> Self {
        Self {
            position: DVec3::Z,
            focal_point: DVec3::ZERO,
            view_up: DVec3::Y,
            view_angle,
            parallel_projection: false,
            parallel_scale: 1.0,
            clip_range: (0.01, 1000.01),
        }
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            position: self.position.to_array(),
            focal_point: self.focal_point.to_array(),
            view_up: self.view_up.to_array(),
            view_angle: self.view_angle,
            parallel_projection: self.parallel_projection,
            parallel_scale: self.parallel_scale,
            clip_range: [self.clip_range.0, self.clip_range.1],
        }
    }

    pub fn restore(&mut self, snap: &CameraSnapshot) {
        self.position = DVec3::from_array(snap.position);
        self.focal_point = DVec3::from_array(snap.focal_point);
        self.view_up = DVec3::from_array(snap.view_up);
        self.view_angle = snap.view_angle;
        self.parallel_projection = snap.parallel_projection;
        self.parallel_scale = snap.parallel_scale;
        self.clip_range = (snap.clip_range[0], snap.clip_range[1]);
    }

    pub fn distance(&self) -> f64 {
        self.position.distance(self.focal_point)
    }

    /// Unit vector from position to focal point
    pub fn direction(&self) -> DVec3 {
        (self.focal_point - self.position).normalize_or_zero()
    }

    fn right(&self) -> DVec3 {
        self.direction().cross(self.view_up).normalize_or_zero()
    }

    /// View matrix (world -> camera)
    pub fn view_matrix(&self) -> DMat4 {
        DMat4::look_at_rh(self.position, self.focal_point, self.view_up)
    }

    /// Projection matrix (camera -> clip)
    pub fn projection_matrix(&self, aspect: f64) -> DMat4 {
        let (near, far) = self.clip_range;
        if self.parallel_projection {
            let h = self.parallel_scale;
            let w = h * aspect;
            DMat4::orthographic_rh_gl(-w, w, -h, h, near, far)
        } else {
            DMat4::perspective_rh_gl(self.view_angle.to_radians(), aspect, near, far)
        }
    }

    /// Combined view-projection matrix
    pub fn view_projection(&self, aspect: f64) -> DMat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// World point to pixel coordinates (origin top-left). None behind the camera.
    pub fn project(&self, point: DVec3, size: DVec2) -> Option<DVec2> {
        let clip = self.view_projection(size.x / size.y) * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(DVec2::new(
            (ndc.x + 1.0) * 0.5 * size.x,
            (1.0 - ndc.y) * 0.5 * size.y,
        ))
    }

    /// Rotate the position about the view-up axis through the focal point.
    pub fn azimuth(&mut self, degrees: f64) {
        let rot = DQuat::from_axis_angle(self.view_up.normalize_or_zero(), degrees.to_radians());
        self.position = self.focal_point + rot * (self.position - self.focal_point);
    }

    /// Rotate the position about the right axis through the focal point.
    pub fn elevation(&mut self, degrees: f64) {
        let right = self.right();
        if right == DVec3::ZERO {
            return;
        }
        let rot = DQuat::from_axis_angle(right, degrees.to_radians());
        self.position = self.focal_point + rot * (self.position - self.focal_point);
        self.view_up = (rot * self.view_up).normalize_or_zero();
    }

    /// Move toward the focal point by `factor` (> 1 closer).
    pub fn dolly(&mut self, factor: f64) {
        if factor <= 0.0 || !factor.is_finite() {
            return;
        }
        if self.parallel_projection {
            self.parallel_scale /= factor;
        } else {
            let dist = self.distance() / factor;
            self.position = self.focal_point - self.direction() * dist;
        }
    }

    /// Translate camera and focal point in the view plane (world units).
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let up = self.right().cross(self.direction()).normalize_or_zero();
        let offset = self.right() * dx + up * dy;
        self.position += offset;
        self.focal_point += offset;
    }

    /// Frame the whole box, keeping the current view direction.
    pub fn reset_to_bounds(&mut self, bounds: &Aabb) {
        let mut dir = self.direction();
        if dir == DVec3::ZERO {
            dir = DVec3::NEG_Z;
        }
        let radius = match bounds.radius() {
            r if r > 0.0 => r,
            _ => 0.5,
        };
        let half_angle = (self.view_angle.to_radians() * 0.5).max(1e-3);
        let distance = radius / half_angle.sin();

        self.focal_point = bounds.center();
        self.position = self.focal_point - dir * distance;
        self.parallel_scale = radius;

        // keep view-up orthogonal to the view direction
        let mut up = self.view_up - dir * self.view_up.dot(dir);
        if up.length_squared() < 1e-12 {
            up = DVec3::Y - dir * dir.y;
        }
        self.view_up = up.normalize_or_zero();

        let near = (distance - radius * 1.1).max(distance * 1e-3);
        self.clip_range = (near, distance + radius * 1.1);
    }
}
