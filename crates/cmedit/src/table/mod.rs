//! Authoritative sounding table loaded from a cm file.
//!
//! Rows are kept in load order, which is also ascending [`RowId`] order, so
//! lookups by id are binary searches. Only [`crate::state::EditSession`]
//! mutates a table; everything else reads it.

mod classify;
mod format;

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use shared::{RowId, FLAG_EXCLUDED};

pub use classify::{map_clusters, MapCluster, ScorePartition};

use crate::error::{EditorResult, FormatError};

/// One sounding. `row_id` is assigned at load and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CmRecord {
    pub row_id: RowId,
    pub cm_id: i64,
    pub lon: f64,
    pub lat: f64,
    pub depth: f64,
    pub sig_h: f64,
    pub sig_d: f64,
    pub source_id: i64,
    pub predicted_depth: f64,
    pub ml_score: f64,
    pub flag: i64,
    /// Free-form trailing columns, passed through on save
    pub metadata: Vec<String>,
}

impl CmRecord {
    pub fn is_flagged(&self) -> bool {
        self.flag == FLAG_EXCLUDED
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointTable {
    rows: Vec<CmRecord>,
}

impl PointTable {
    /// Parse a whole cm stream. Either every row parses or nothing is returned.
    ///
    /// The 10th column is read as the flag only when it is an integer on every
    /// row; otherwise it is metadata and the flag column is added on save.
    pub fn load<R: BufRead>(reader: R) -> Result<Self, FormatError> {
        let mut lines = Vec::new();
        let mut width: Option<usize> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let raw = line.map_err(|e| FormatError::new(line_no, e.to_string()))?;
            let field_count = format::split_fields(&raw, line_no)?.len();
            if field_count == 0 {
                continue;
            }
            match width {
                None => width = Some(field_count),
                Some(w) if w != field_count => {
                    return Err(FormatError::new(
                        line_no,
                        format!("expected {w} columns, found {field_count}"),
                    ));
                }
                Some(_) => {}
            }
            lines.push((line_no, raw));
        }

        let flag_column = lines.iter().all(|(_, raw)| {
            let fields: Vec<&str> = raw.split_whitespace().collect();
            format::has_flag_field(&fields)
        });

        let mut rows = Vec::with_capacity(lines.len());
        for (line_no, raw) in &lines {
            let fields = format::split_fields(raw, *line_no)?;
            let row_id = u32::try_from(rows.len())
                .map(RowId)
                .map_err(|_| FormatError::new(*line_no, "too many rows"))?;
            rows.push(format::parse_record(&fields, row_id, *line_no, flag_column)?);
        }

        tracing::debug!(
            "parsed {} cm rows ({} columns, flag column: {flag_column})",
            rows.len(),
            width.unwrap_or(0)
        );
        Ok(Self { rows })
    }

    pub fn load_str(text: &str) -> Result<Self, FormatError> {
        Self::load(text.as_bytes())
    }

    pub fn read_file(path: &Path) -> EditorResult<Self> {
        let file = std::fs::File::open(path)?;
        let table = Self::load(BufReader::new(file))?;
        tracing::info!("loaded {} soundings from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn from_records(mut rows: Vec<CmRecord>) -> Self {
        rows.sort_by_key(|r| r.row_id);
        rows.dedup_by_key(|r| r.row_id);
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[CmRecord] {
        &self.rows
    }

    /// Current table position of a row id, if the row still exists
    pub fn position_of(&self, id: RowId) -> Option<usize> {
        self.rows.binary_search_by_key(&id, |r| r.row_id).ok()
    }

    pub fn get(&self, id: RowId) -> Option<&CmRecord> {
        self.position_of(id).map(|i| &self.rows[i])
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn row_ids(&self) -> impl Iterator<Item = RowId> + '_ {
        self.rows.iter().map(|r| r.row_id)
    }

    pub fn flagged_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_flagged()).count()
    }

    /// Set the flag column of every listed row. Ids that no longer exist are
    /// skipped. Returns the number of rows touched.
    pub fn apply_flag(&mut self, ids: &BTreeSet<RowId>, flag: i64) -> usize {
        let mut touched = 0;
        for id in ids {
            if let Some(pos) = self.position_of(*id) {
                self.rows[pos].flag = flag;
                touched += 1;
            }
        }
        touched
    }

    /// A copy of this table without the listed rows. Survivors keep their
    /// row ids and relative order.
    pub fn delete_rows(&self, ids: &BTreeSet<RowId>) -> PointTable {
        let rows = self
            .rows
            .iter()
            .filter(|r| !ids.contains(&r.row_id))
            .cloned()
            .collect();
        PointTable { rows }
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        for row in &self.rows {
            writeln!(out, "{}", format::format_record(row))?;
        }
        out.flush()
    }

    pub fn save(&self, path: &Path) -> EditorResult<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))?;
        tracing::info!("saved {} soundings to {}", self.len(), path.display());
        Ok(())
    }
}

/// `*.cm` files directly inside `dir`, sorted by name.
pub fn list_cm_files(dir: &Path) -> EditorResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "cm") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
