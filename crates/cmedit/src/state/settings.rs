//! Application settings

use std::path::Path;

use serde::{Deserialize, Serialize};
use shared::ScoreThresholds;

use crate::error::{EditorError, EditorResult};

/// Point cloud build and display settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    /// Refuse to build clouds larger than this
    pub max_points: usize,
    /// Depth is divided by this to bring it to the scale of lon/lat
    pub depth_divisor: f64,
    /// Rendered point size in pixels
    pub point_size: f32,
    /// Point size of the selection highlight
    pub highlight_point_size: f32,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            max_points: 100_000_000,
            depth_divisor: 10_000.0,
            point_size: 4.0,
            highlight_point_size: 10.0,
        }
    }
}

/// Predicted surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictedSettings {
    /// Shell script producing predicted.xyz and difference.xyz
    pub script: String,
    /// Gray level at the minimum predicted depth (0 black, 1 white)
    pub gray_low: f64,
    /// Gray level at the maximum predicted depth
    pub gray_high: f64,
}

impl Default for PredictedSettings {
    fn default() -> Self {
        Self {
            script: "get_predicted.sh".to_string(),
            gray_low: 0.25,
            gray_high: 0.65,
        }
    }
}

/// Viewport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees
    pub view_angle: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            width: 900,
            height: 700,
            view_angle: 30.0,
        }
    }
}

/// All application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub cloud: CloudSettings,
    pub thresholds: ScoreThresholds,
    pub predicted: PredictedSettings,
    pub viewport: ViewportSettings,
}

impl AppSettings {
    fn config_path() -> Option<std::path::PathBuf> {
        directories::ProjectDirs::from("org", "cmedit", "cmedit")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return default if not found
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_or_default(&path),
            None => Self::default(),
        }
    }

    /// Settings at `path`, or the defaults when the file is missing, unreadable
    /// or holds invalid values.
    pub fn load_or_default(path: &Path) -> Self {
        let Ok(json) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        let settings: Self = match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("ignoring {}: {e}", path.display());
                return Self::default();
            }
        };
        match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                tracing::warn!("ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load from an explicit path; unlike [`AppSettings::load`] a bad file is an error.
    pub fn load_from(path: &Path) -> EditorResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json)
            .map_err(|e| EditorError::InvalidArgument(format!("{}: {e}", path.display())))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the platform config directory
    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Err(e) = self.save_to(&path) {
                tracing::warn!("could not save settings to {}: {e}", path.display());
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> EditorResult<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EditorError::InvalidArgument(e.to_string()))?;
        std::fs::write(path, json)?;
        tracing::info!("saved settings to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> EditorResult<()> {
        self.thresholds
            .validate()
            .map_err(EditorError::InvalidArgument)?;
        if !(self.cloud.depth_divisor.is_finite() && self.cloud.depth_divisor > 0.0) {
            return Err(EditorError::InvalidArgument(
                "depth_divisor must be positive".to_string(),
            ));
        }
        let sizes = [self.cloud.point_size, self.cloud.highlight_point_size];
        if !sizes.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(EditorError::InvalidArgument(
                "point sizes must be positive".to_string(),
            ));
        }
        if !(self.viewport.view_angle > 0.0 && self.viewport.view_angle < 180.0) {
            return Err(EditorError::InvalidArgument(
                "view_angle must be between 0 and 180 degrees".to_string(),
            ));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(EditorError::InvalidArgument(
                "viewport size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
