//! Observed and predicted surface meshes of a session.

use std::path::Path;

use glam::DVec3;
use shared::RowId;

use super::EditSession;
use crate::cloud::{AxisScale, ScalarChannel};
use crate::error::{EditorError, EditorResult};
use crate::predicted::{Prediction, PredictionJob};
use crate::state::settings::CloudSettings;
use crate::surface::{GrayBand, MeshState, SurfaceMesh, SurfaceToggle};

/// The external prediction grid, drawn as a gray surface.
#[derive(Debug, Clone)]
pub struct PredictedLayer {
    /// Raw `lon lat depth`
    points: Vec<DVec3>,
    pub(super) mesh: MeshState,
    band: GrayBand,
}

impl PredictedLayer {
    fn new(points: Vec<DVec3>, band: GrayBand) -> Self {
        Self {
            points,
            mesh: MeshState::default(),
            band,
        }
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn mesh(&self) -> &MeshState {
        &self.mesh
    }

    pub fn band(&self) -> GrayBand {
        self.band
    }

    /// Scene positions, built the same way as the observed cloud.
    pub fn positions(&self, settings: &CloudSettings, scale: AxisScale) -> Vec<DVec3> {
        self.points
            .iter()
            .map(|p| {
                DVec3::new(p.x * scale.x, p.y * scale.y, p.z / settings.depth_divisor * scale.z)
            })
            .collect()
    }

    /// Per-vertex gray level of the current mesh, empty when none is built.
    pub fn gray_levels(&self) -> Vec<f64> {
        match self.mesh.mesh() {
            Some(mesh) => {
                let range = mesh.scalar_range();
                mesh.scalars.iter().map(|&d| self.band.gray(d, range)).collect()
            }
            None => Vec::new(),
        }
    }
}

impl EditSession {
    /// Triangulate the observed cloud, or flip visibility of a current mesh.
    /// A failed triangulation leaves any previous mesh untouched.
    pub fn toggle_surface(&mut self) -> EditorResult<SurfaceToggle> {
        let Some(cloud) = &self.cloud else {
            return Err(self
                .render_error
                .map(EditorError::from)
                .unwrap_or(EditorError::NoTable));
        };
        self.surface
            .toggle_with(|| {
                SurfaceMesh::build(cloud.positions(), cloud.scalars(ScalarChannel::Depth))
            })
            .map_err(|e| {
                tracing::warn!("surface skipped: {e}");
                EditorError::from(e)
            })
    }

    pub fn toggle_predicted_surface(&mut self) -> EditorResult<SurfaceToggle> {
        let settings = &self.cloud_settings;
        let scale = self.scale;
        let layer = self.predicted.as_mut().ok_or(EditorError::NoPrediction)?;
        let positions = layer.positions(settings, scale);
        let depths: Vec<f64> = layer.points.iter().map(|p| p.z).collect();
        layer
            .mesh
            .toggle_with(|| SurfaceMesh::build(&positions, &depths))
            .map_err(|e| {
                tracing::warn!("predicted surface skipped: {e}");
                EditorError::from(e)
            })
    }

    /// Move the gray band of the predicted surface. Values are clamped to 0..=1.
    pub fn set_predicted_band(&mut self, low: f64, high: f64) -> EditorResult<GrayBand> {
        if !low.is_finite() || !high.is_finite() {
            return Err(EditorError::InvalidArgument(
                "gray levels must be finite".to_string(),
            ));
        }
        let layer = self.predicted.as_mut().ok_or(EditorError::NoPrediction)?;
        layer.band = GrayBand::new(low, high);
        Ok(layer.band)
    }

    /// Install a prediction: difference channel plus predicted layer.
    pub fn attach_prediction(&mut self, prediction: Prediction) -> EditorResult<()> {
        let cloud = self.build_cloud(&self.table, self.scale, Some(&prediction.difference))?;
        self.difference = Some(prediction.difference);
        let table = std::mem::take(&mut self.table);
        self.install(table, self.scale, cloud);

        let band = GrayBand::new(
            self.predicted_settings.gray_low,
            self.predicted_settings.gray_high,
        );
        self.predicted = Some(PredictedLayer::new(prediction.points, band));
        Ok(())
    }

    /// Attach precomputed output files. Difference rows pair with the current
    /// table rows in order.
    pub fn load_prediction_files(&mut self, predicted: &Path, difference: &Path) -> EditorResult<()> {
        let order: Vec<RowId> = self.table.row_ids().collect();
        let prediction = Prediction::from_files(predicted, difference, &order)?;
        self.attach_prediction(prediction)
    }

    /// Job for the configured script, run next to the loaded cm file.
    pub fn prediction_job(&self) -> EditorResult<PredictionJob> {
        let source = self.source.as_deref().ok_or(EditorError::NoTable)?;
        let work_dir = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Ok(PredictionJob::new(&self.predicted_settings.script, work_dir))
    }

    /// Run the prediction script synchronously. Failure keeps the session as is.
    pub fn run_prediction(&mut self, job: &PredictionJob) -> EditorResult<()> {
        let source = self.source.clone().ok_or(EditorError::NoTable)?;
        let prediction = job.run(&self.table, &source)?;
        self.attach_prediction(prediction)
    }
}
