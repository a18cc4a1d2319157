//! Volumetric rubber-band picking.
//!
//! A screen rectangle is turned into six world-space planes by narrowing the
//! camera's view-projection to the rectangle and extracting the clip planes
//! from the resulting matrix rows. A point is selected iff it lies on the
//! inner side of all six. Points hidden behind others are still selected.

use glam::{DMat4, DVec2, DVec3, DVec4};

use super::camera::Camera;
use crate::cloud::SceneCloud;
use crate::state::selection::Selection;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(Self { min, max })
    }

    /// Center of the bounding box
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Radius of the bounding sphere
    pub fn radius(&self) -> f64 {
        self.size().length() * 0.5
    }

    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Oriented plane; `distance >= 0` is the inner side.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    pub n: DVec3,
    pub d: f64,
}

impl Plane {
    fn from_row(row: DVec4) -> Self {
        Self {
            n: row.truncate(),
            d: row.w,
        }
        .normalize()
    }

    pub fn normalize(self) -> Self {
        let len = self.n.length();
        if len <= 0.0 {
            return self;
        }
        Self {
            n: self.n / len,
            d: self.d / len,
        }
    }

    pub fn distance(&self, p: DVec3) -> f64 {
        self.n.dot(p) + self.d
    }
}

/// Selection volume: left, right, bottom, top, near, far.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Planes of a column-major view-projection matrix in the GL clip
    /// convention (`-w <= x, y, z <= w`).
    pub fn from_view_projection(m: DMat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        Self {
            planes: [
                Plane::from_row(r3 + r0),
                Plane::from_row(r3 - r0),
                Plane::from_row(r3 + r1),
                Plane::from_row(r3 - r1),
                Plane::from_row(r3 + r2),
                Plane::from_row(r3 - r2),
            ],
        }
    }

    /// Frustum through the given pixel rectangle of a viewport of `size`.
    pub fn from_screen_rect(camera: &Camera, size: DVec2, rect: ScreenRect) -> Self {
        let rect = rect.clamped_to(size);
        // pixel rect -> NDC rect, y up
        let x0 = 2.0 * rect.min.x / size.x - 1.0;
        let x1 = 2.0 * rect.max.x / size.x - 1.0;
        let y0 = 1.0 - 2.0 * rect.max.y / size.y;
        let y1 = 1.0 - 2.0 * rect.min.y / size.y;

        // Stretch the NDC sub-rectangle to the full [-1, 1] square
        let sx = 2.0 / (x1 - x0);
        let sy = 2.0 / (y1 - y0);
        let narrow = DMat4::from_cols(
            DVec4::new(sx, 0.0, 0.0, 0.0),
            DVec4::new(0.0, sy, 0.0, 0.0),
            DVec4::new(0.0, 0.0, 1.0, 0.0),
            DVec4::new(-(x0 + x1) / (x1 - x0), -(y0 + y1) / (y1 - y0), 0.0, 1.0),
        );
        let aspect = size.x / size.y;
        Self::from_view_projection(narrow * camera.view_projection(aspect))
    }

    pub fn contains(&self, p: DVec3) -> bool {
        self.planes.iter().all(|plane| plane.distance(p) >= 0.0)
    }

    /// Conservative box test (p-vertex).
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let p = DVec3::select(plane.n.cmpge(DVec3::ZERO), aabb.max, aabb.min);
            plane.distance(p) >= 0.0
        })
    }
}

/// Rubber-band rectangle in pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub min: DVec2,
    pub max: DVec2,
}

impl ScreenRect {
    /// Normalizes corner order; degenerate drags become a one pixel box.
    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        let mut min = a.min(b);
        let mut max = a.max(b);
        if max.x - min.x < 1.0 {
            min.x -= 0.5;
            max.x = min.x + 1.0;
        }
        if max.y - min.y < 1.0 {
            min.y -= 0.5;
            max.y = min.y + 1.0;
        }
        Self { min, max }
    }

    fn clamped_to(self, size: DVec2) -> Self {
        let min = self.min.clamp(DVec2::ZERO, size - 1.0);
        let max = self.max.clamp(min + 1.0, size);
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Row ids of every cloud point inside the frustum.
pub fn select_in_frustum(cloud: &SceneCloud, frustum: &Frustum) -> Selection {
    let Some(bounds) = cloud.bounds() else {
        return Selection::default();
    };
    if !frustum.intersects_aabb(&bounds) {
        return Selection::default();
    }
    cloud
        .positions()
        .iter()
        .zip(cloud.row_ids())
        .filter(|(p, _)| frustum.contains(**p))
        .map(|(_, id)| *id)
        .collect()
}
