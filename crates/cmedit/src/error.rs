//! Error taxonomy of the editor core.
//!
//! Structural errors (format, capacity) abort the triggering action and leave
//! the previous state in place. Mesh and subprocess errors are recoverable:
//! callers skip the optional feature and keep the session alive.

use thiserror::Error;

/// Malformed cm/xyz input. Fatal to the load only.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {reason} (file must be space-delimited ASCII)")]
pub struct FormatError {
    /// 1-based line number in the source file
    pub line: usize,
    pub reason: String,
}

impl FormatError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// Dataset too large for the renderer's index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("point cloud holds {count} points, renderer limit is {max}")]
pub struct CapacityError {
    pub count: usize,
    pub max: usize,
}

/// Degenerate geometry handed to the triangulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("need at least 3 distinct points, got {count}")]
    TooFewPoints { count: usize },
    #[error("all points are collinear in plan view")]
    Collinear,
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error("cannot triangulate: {0}")]
    Mesh(#[from] MeshError),
    #[error("no .cm file loaded")]
    NoTable,
    #[error("no predicted surface loaded")]
    NoPrediction,
    #[error("processing failed: {0}")]
    Subprocess(String),
    #[error("invalid polygon data: {0}")]
    Polygon(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EditorResult<T> = Result<T, EditorError>;
