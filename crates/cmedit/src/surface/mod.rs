//! Interpolated surfaces over observed and predicted soundings.

mod delaunay;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

pub use delaunay::triangulate;

use crate::error::MeshError;

/// Triangle surface: plan-view Delaunay faces, z kept for display and colour.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    pub positions: Vec<DVec3>,
    /// Three indices per triangle, counter-clockwise seen from +z
    pub indices: Vec<u32>,
    /// Per-vertex colour scalar (depth)
    pub scalars: Vec<f64>,
}

impl SurfaceMesh {
    /// Triangulate positions in plan view. `scalars` must match `positions`.
    pub fn build(positions: &[DVec3], scalars: &[f64]) -> Result<Self, MeshError> {
        let plan: Vec<DVec2> = positions.iter().map(|p| p.truncate()).collect();
        let tris = triangulate(&plan)?;
        tracing::info!("triangulated {} points into {} faces", positions.len(), tris.len());
        Ok(Self {
            positions: positions.to_vec(),
            indices: tris.into_iter().flatten().collect(),
            scalars: scalars.to_vec(),
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn scalar_range(&self) -> (f64, f64) {
        self.scalars
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, 0.0))
    }
}

/// Mesh lifecycle. A stale mesh is still drawn but no longer matches the cloud.
#[derive(Debug, Clone, Default)]
pub enum MeshState {
    #[default]
    Empty,
    Current { mesh: SurfaceMesh, visible: bool },
    Stale { mesh: SurfaceMesh, visible: bool },
}

/// Outcome of a surface toggle, for logging and the command layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceToggle {
    Built { triangles: usize },
    Shown,
    Hidden,
}

impl MeshState {
    pub fn mesh(&self) -> Option<&SurfaceMesh> {
        match self {
            MeshState::Empty => None,
            MeshState::Current { mesh, .. } | MeshState::Stale { mesh, .. } => Some(mesh),
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(
            self,
            MeshState::Current { visible: true, .. } | MeshState::Stale { visible: true, .. }
        )
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, MeshState::Stale { .. })
    }

    /// The source cloud was rebuilt.
    pub fn invalidate(&mut self) {
        *self = match std::mem::take(self) {
            MeshState::Current { mesh, visible } => MeshState::Stale { mesh, visible },
            other => other,
        };
    }

    /// Flip visibility of a current mesh, otherwise triangulate with `build`.
    /// On failure the state is left exactly as it was.
    pub fn toggle_with(
        &mut self,
        build: impl FnOnce() -> Result<SurfaceMesh, MeshError>,
    ) -> Result<SurfaceToggle, MeshError> {
        if let MeshState::Current { visible, .. } = self {
            *visible = !*visible;
            return Ok(if *visible {
                SurfaceToggle::Shown
            } else {
                SurfaceToggle::Hidden
            });
        }
        let mesh = build()?;
        let triangles = mesh.triangle_count();
        *self = MeshState::Current {
            mesh,
            visible: true,
        };
        Ok(SurfaceToggle::Built { triangles })
    }
}

/// Grayscale ramp for the predicted surface: the minimum of the depth range
/// maps to `low`, the maximum to `high` (0 black, 1 white).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrayBand {
    pub low: f64,
    pub high: f64,
}

impl GrayBand {
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low: low.clamp(0.0, 1.0),
            high: high.clamp(0.0, 1.0),
        }
    }

    /// Gray level of `value` within `range`, linearly interpolated.
    pub fn gray(&self, value: f64, range: (f64, f64)) -> f64 {
        let (min, max) = range;
        let t = if max > min {
            ((value - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.low + (self.high - self.low) * t
    }
}
