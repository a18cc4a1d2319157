//! JSON command protocol for scripted editing sessions.
//!
//! Each command maps onto one harness call, so a script replays exactly what a
//! sequence of button clicks and key presses would do.

use std::path::PathBuf;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::EditorResult;
use crate::harness::EditorHarness;
use crate::polygon;

/// A command a script or agent can execute.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditorCommand {
    /// Load a cm file, replacing the current session
    Load { path: PathBuf },
    /// Save the edited table in cm format
    Save { path: PathBuf },
    TogglePicking,
    /// Rubber band between two pixel corners (origin top-left)
    PickRect { from: [f64; 2], to: [f64; 2] },
    /// Rubber band over a plan-view rectangle in scene units
    PickWorldRect { min: [f64; 2], max: [f64; 2] },
    /// Exclude the highlighted soundings
    Flag,
    /// Remove the highlighted soundings
    Delete,
    Rescale { x: f64, y: f64, z: f64 },
    ToggleChannel,
    ToggleSurface,
    TogglePredictedSurface,
    PredictedBand { low: f64, high: f64 },
    /// Attach precomputed prediction output
    AttachPrediction { predicted: PathBuf, difference: PathBuf },
    /// Run the configured prediction script (blocks until it exits)
    RunPrediction,
    /// Flag soundings inside GeoJSON polygons, given inline or as a file.
    /// `export` writes the applied polygons back out with fresh feature ids.
    FlagWithin {
        #[serde(default)]
        path: Option<PathBuf>,
        #[serde(default)]
        geojson: Option<serde_json::Value>,
        #[serde(default)]
        export: Option<PathBuf>,
    },
    Partition,
    /// Per-class point lists for the map view
    MapClusters,
    Thresholds { bad: f64, uncertain: f64 },
    /// `*.cm` files of a directory, sorted
    ListCmFiles { dir: PathBuf },
    /// Persist settings to `path`, or the platform config directory
    SaveSettings {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    Key { key: char },
    RestoreCamera,
    PointSize { size: f32 },
    ExportSelection { path: PathBuf },
    /// Render a frame and report what it contains
    Inspect,
}

/// Response from executing a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

impl From<EditorResult<serde_json::Value>> for CommandResponse {
    fn from(result: EditorResult<serde_json::Value>) -> Self {
        match result {
            Ok(serde_json::Value::Null) => Self::ok(),
            Ok(data) => Self::ok_with_data(data),
            Err(e) => {
                tracing::warn!("command failed: {e}");
                Self::err(e.to_string())
            }
        }
    }
}

fn to_value<T: Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn run(harness: &mut EditorHarness, cmd: EditorCommand) -> EditorResult<serde_json::Value> {
    use serde_json::json;

    let data = match cmd {
        EditorCommand::Load { path } => {
            let rows = harness.load_file(&path)?;
            json!({ "rows": rows })
        }
        EditorCommand::Save { path } => {
            harness.save(&path)?;
            json!({ "rows": harness.row_count() })
        }
        EditorCommand::TogglePicking => json!({ "mode": harness.toggle_picking()? }),
        EditorCommand::PickRect { from, to } => {
            let picked = harness.pick_rect(DVec2::from_array(from), DVec2::from_array(to))?;
            json!({ "selected": picked })
        }
        EditorCommand::PickWorldRect { min, max } => {
            let picked =
                harness.pick_world_rect(DVec2::from_array(min), DVec2::from_array(max))?;
            json!({ "selected": picked })
        }
        EditorCommand::Flag => to_value(harness.flag()?),
        EditorCommand::Delete => to_value(harness.delete()?),
        EditorCommand::Rescale { x, y, z } => {
            harness.rescale(x, y, z)?;
            serde_json::Value::Null
        }
        EditorCommand::ToggleChannel => json!({ "channel": harness.toggle_channel()? }),
        EditorCommand::ToggleSurface => to_value(harness.toggle_surface()?),
        EditorCommand::TogglePredictedSurface => to_value(harness.toggle_predicted_surface()?),
        EditorCommand::PredictedBand { low, high } => {
            to_value(harness.set_predicted_band(low, high)?)
        }
        EditorCommand::AttachPrediction {
            predicted,
            difference,
        } => {
            harness.load_prediction_files(&predicted, &difference)?;
            serde_json::Value::Null
        }
        EditorCommand::RunPrediction => {
            harness.run_prediction()?;
            serde_json::Value::Null
        }
        EditorCommand::FlagWithin {
            path,
            geojson,
            export,
        } => {
            let polygons = match (path, geojson) {
                (Some(path), None) => polygon::read_geojson(&path)?,
                (None, Some(value)) => polygon::parse_geojson(&value.to_string())?,
                _ => {
                    return Err(crate::error::EditorError::InvalidArgument(
                        "flag_within needs exactly one of path or geojson".to_string(),
                    ))
                }
            };
            let flagged = harness.flag_within(&polygons)?;
            if let Some(export) = export {
                polygon::write_geojson(&export, &polygons)?;
            }
            json!({ "flagged": flagged })
        }
        EditorCommand::Partition => {
            let part = harness.partition()?;
            json!({
                "bad": part.bad,
                "uncertain": part.uncertain,
                "good": part.good,
            })
        }
        EditorCommand::MapClusters => to_value(harness.map_clusters()?),
        EditorCommand::Thresholds { bad, uncertain } => {
            to_value(harness.set_thresholds(bad, uncertain)?)
        }
        EditorCommand::ListCmFiles { dir } => {
            let files = crate::table::list_cm_files(&dir)?;
            json!({ "files": files })
        }
        EditorCommand::SaveSettings { path } => {
            harness.save_settings(path.as_deref())?;
            serde_json::Value::Null
        }
        EditorCommand::Key { key } => json!({ "action": harness.key(key)? }),
        EditorCommand::RestoreCamera => json!({ "restored": harness.restore_camera() }),
        EditorCommand::PointSize { size } => json!({ "point_size": harness.set_point_size(size) }),
        EditorCommand::ExportSelection { path } => {
            json!({ "exported": harness.export_selection(&path)? })
        }
        EditorCommand::Inspect => {
            let frame = harness.render()?;
            let session = harness.session();
            json!({
                "rows": harness.row_count(),
                "flagged": session.map_or(0, |s| s.table().flagged_count()),
                "selected": harness.selected_count(),
                "version": session.map_or(0, |s| s.version()),
                "channel_label": frame.channel.label(),
                "frame": frame,
            })
        }
    };
    Ok(data)
}

/// Execute a single command on the harness.
pub fn execute_command(harness: &mut EditorHarness, cmd: EditorCommand) -> CommandResponse {
    run(harness, cmd).into()
}

/// Parse and execute a single JSON command string.
pub fn execute_json(harness: &mut EditorHarness, json: &str) -> Result<CommandResponse, String> {
    let cmd: EditorCommand =
        serde_json::from_str(json).map_err(|e| format!("Invalid command JSON: {e}"))?;
    Ok(execute_command(harness, cmd))
}

/// Parse and execute multiple JSON commands (array).
pub fn execute_json_batch(
    harness: &mut EditorHarness,
    json: &str,
) -> Result<Vec<CommandResponse>, String> {
    let cmds: Vec<EditorCommand> =
        serde_json::from_str(json).map_err(|e| format!("Invalid commands JSON: {e}"))?;
    Ok(cmds
        .into_iter()
        .map(|cmd| execute_command(harness, cmd))
        .collect())
}
