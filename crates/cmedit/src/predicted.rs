//! Predicted bathymetry produced by an external script.
//!
//! The editor writes the current soundings to `input.xyz`, runs the script,
//! then trusts whatever lands in `predicted.xyz` and `difference.xyz`. Row `i`
//! of the difference file belongs to row `i` of `input.xyz`; that binding is
//! captured as row ids so it survives later deletions.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use glam::DVec3;
use shared::RowId;

use crate::error::{EditorError, EditorResult, FormatError};
use crate::table::PointTable;

pub const INPUT_FILE: &str = "input.xyz";
pub const PREDICTED_FILE: &str = "predicted.xyz";
pub const DIFFERENCE_FILE: &str = "difference.xyz";

/// Parse whitespace-delimited `x y z` rows. Extra columns are ignored.
pub fn read_xyz<R: BufRead>(reader: R) -> Result<Vec<DVec3>, FormatError> {
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let raw = line.map_err(|e| FormatError::new(line_no, e.to_string()))?;
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 3 {
            return Err(FormatError::new(
                line_no,
                format!("expected 3 columns, found {}", fields.len()),
            ));
        }
        let mut xyz = [0.0; 3];
        for (slot, field) in xyz.iter_mut().zip(&fields) {
            *slot = field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| FormatError::new(line_no, format!("not a number: {field:?}")))?;
        }
        out.push(DVec3::from_array(xyz));
    }
    Ok(out)
}

pub fn read_xyz_file(path: &Path) -> EditorResult<Vec<DVec3>> {
    let file = std::fs::File::open(path)?;
    Ok(read_xyz(BufReader::new(file))?)
}

/// Write `lon lat depth` per row; returns the row order written.
pub fn write_input_xyz<W: Write>(table: &PointTable, mut out: W) -> std::io::Result<Vec<RowId>> {
    let mut order = Vec::with_capacity(table.len());
    for row in table.rows() {
        writeln!(out, "{:10.6} {:10.6} {:10.6}", row.lon, row.lat, row.depth)?;
        order.push(row.row_id);
    }
    out.flush()?;
    Ok(order)
}

/// Observed minus predicted depth, keyed by row id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthDifference {
    values: HashMap<RowId, f64>,
}

impl DepthDifference {
    /// Pair the z column of `rows` with the row order written to `input.xyz`.
    pub fn bind(order: &[RowId], rows: &[DVec3]) -> EditorResult<Self> {
        if order.len() != rows.len() {
            return Err(EditorError::Subprocess(format!(
                "{DIFFERENCE_FILE} has {} rows, {INPUT_FILE} had {}",
                rows.len(),
                order.len()
            )));
        }
        Ok(Self {
            values: order.iter().copied().zip(rows.iter().map(|p| p.z)).collect(),
        })
    }

    pub fn get(&self, id: RowId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Everything one prediction run produced.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Raw `lon lat depth` points of the predicted grid
    pub points: Vec<DVec3>,
    pub difference: DepthDifference,
}

impl Prediction {
    /// Load an already computed pair of files.
    pub fn from_files(predicted: &Path, difference: &Path, order: &[RowId]) -> EditorResult<Self> {
        let points = read_xyz_file(predicted)?;
        let diff_rows = read_xyz_file(difference)?;
        let difference = DepthDifference::bind(order, &diff_rows)?;
        tracing::info!(
            "loaded prediction: {} grid points, {} differences",
            points.len(),
            difference.len()
        );
        Ok(Self { points, difference })
    }
}

/// One synchronous run of the prediction script.
#[derive(Debug, Clone)]
pub struct PredictionJob {
    pub script: PathBuf,
    /// Directory holding input and output files; relative scripts resolve here
    pub work_dir: PathBuf,
}

impl PredictionJob {
    pub fn new(script: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Blocks until the script exits. In-memory state is never touched here.
    pub fn run(&self, table: &PointTable, cm_path: &Path) -> EditorResult<Prediction> {
        let input = self.work_dir.join(INPUT_FILE);
        let file = std::fs::File::create(&input)?;
        let order = write_input_xyz(table, std::io::BufWriter::new(file))?;

        let script = self.work_dir.join(&self.script);
        tracing::info!("Please wait while we process your request... ({})", script.display());
        let status = Command::new("bash")
            .arg(&script)
            .arg(cm_path)
            .current_dir(&self.work_dir)
            .status()
            .map_err(|e| EditorError::Subprocess(format!("{}: {e}", script.display())))?;
        if !status.success() {
            tracing::error!("prediction script failed: {status}");
            return Err(EditorError::Subprocess(format!(
                "{} exited with {status}",
                script.display()
            )));
        }

        let predicted = self.work_dir.join(PREDICTED_FILE);
        let difference = self.work_dir.join(DIFFERENCE_FILE);
        for path in [&predicted, &difference] {
            if !path.is_file() {
                return Err(EditorError::Subprocess(format!(
                    "missing output {}",
                    path.display()
                )));
            }
        }
        Prediction::from_files(&predicted, &difference, &order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_read_xyz_ignores_extra_columns() {
        let pts = read_xyz("1 2 3 extra\n\n4 5 6\n".as_bytes()).unwrap();
        assert_eq!(pts, vec![DVec3::new(1.0, 2.0, 3.0), DVec3::new(4.0, 5.0, 6.0)]);
        let err = read_xyz("1 2\n".as_bytes()).unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_input_xyz_format() {
        let table = fixtures::table_from_points(&[(10.5, -20.25, -4500.0)]);
        let mut buf = Vec::new();
        let order = write_input_xyz(&table, &mut buf).unwrap();
        assert_eq!(order, vec![RowId(0)]);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            " 10.500000 -20.250000 -4500.000000\n"
        );
    }

    #[test]
    fn test_difference_binding_survives_deletion() {
        let order = [RowId(0), RowId(1), RowId(2)];
        let rows = [
            DVec3::new(0.0, 0.0, 1.5),
            DVec3::new(0.0, 0.0, -2.5),
            DVec3::new(0.0, 0.0, 7.0),
        ];
        let diff = DepthDifference::bind(&order, &rows).unwrap();
        assert_eq!(diff.get(RowId(2)), Some(7.0));
        assert_eq!(diff.get(RowId(5)), None);
        assert!(DepthDifference::bind(&order[..2], &rows).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_job_runs_script_and_reads_outputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("predict.sh"),
            "awk '{print $1, $2, $3 + 1}' input.xyz > predicted.xyz\n\
             awk '{print $1, $2, -1}' input.xyz > difference.xyz\n",
        )
        .unwrap();
        let table = fixtures::table_from_points(&[(1.0, 2.0, -10.0), (3.0, 4.0, -20.0)]);
        let job = PredictionJob::new("predict.sh", dir.path());
        let out = job.run(&table, Path::new("survey.cm")).unwrap();
        assert_eq!(out.points.len(), 2);
        assert_eq!(out.points[1], DVec3::new(3.0, 4.0, -19.0));
        assert_eq!(out.difference.get(RowId(1)), Some(-1.0));
    }

    #[cfg(unix)]
    #[test]
    fn test_job_failure_is_subprocess_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fail.sh"), "exit 3\n").unwrap();
        let table = fixtures::table_from_points(&[(1.0, 2.0, -10.0)]);
        let err = PredictionJob::new("fail.sh", dir.path())
            .run(&table, Path::new("survey.cm"))
            .unwrap_err();
        assert!(matches!(err, EditorError::Subprocess(_)));
    }
}
