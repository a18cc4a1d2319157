//! Save, export and classification views of a session.

use std::io::Write;
use std::path::Path;

use super::EditSession;
use crate::error::EditorResult;
use crate::table::{map_clusters, MapCluster, ScorePartition};

/// Decimal places for coordinates in a selection export
const EXPORT_PRECISION: usize = 6;

impl EditSession {
    /// Write the edited table in cm format.
    pub fn save(&self, path: &Path) -> EditorResult<()> {
        self.table.save(path)
    }

    /// Highlighted rows as `row_id cm_id lon lat depth`. Returns the line count.
    pub fn export_selection<W: Write>(&self, mut out: W) -> EditorResult<usize> {
        let Some(selection) = self.selection() else {
            return Ok(0);
        };
        let p = EXPORT_PRECISION;
        let mut written = 0;
        for id in selection.iter() {
            if let Some(row) = self.table.get(id) {
                writeln!(
                    out,
                    "{} {} {:.p$} {:.p$} {:.p$}",
                    row.row_id, row.cm_id, row.lon, row.lat, row.depth
                )?;
                written += 1;
            }
        }
        out.flush()?;
        Ok(written)
    }

    pub fn export_selection_file(&self, path: &Path) -> EditorResult<usize> {
        let file = std::fs::File::create(path)?;
        let n = self.export_selection(std::io::BufWriter::new(file))?;
        tracing::info!("exported {n} selected soundings to {}", path.display());
        Ok(n)
    }

    pub fn partition(&self) -> ScorePartition {
        self.table.partition(&self.thresholds)
    }

    pub fn map_clusters(&self) -> Vec<MapCluster> {
        map_clusters(&self.table, &self.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use shared::RowId;

    use crate::fixtures;
    use crate::state::selection::Selection;
    use crate::state::session::EditSession;
    use crate::state::settings::AppSettings;
    use crate::viewport::selector::PickTarget;

    #[test]
    fn test_export_selection_uses_row_ids() {
        let mut s = EditSession::new(fixtures::zigzag_table(), None, &AppSettings::default());
        s.commit_selection([RowId(3), RowId(1)].into_iter().collect::<Selection>());
        let mut buf = Vec::new();
        assert_eq!(s.export_selection(&mut buf).unwrap(), 2);
        let text = String::from_utf8(buf).unwrap();
        let first = text.lines().next().unwrap();
        assert_eq!(first, "1 2 1.000000 1.000000 -1000.000000");
    }

    #[test]
    fn test_export_without_selection_writes_nothing() {
        let s = EditSession::new(fixtures::zigzag_table(), None, &AppSettings::default());
        let mut buf = Vec::new();
        assert_eq!(s.export_selection(&mut buf).unwrap(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_save_writes_flag_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edited.cm");
        let mut s = EditSession::new(fixtures::zigzag_table(), None, &AppSettings::default());
        s.flag_rows(&[RowId(0)].into_iter().collect()).unwrap();
        s.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let first: Vec<&str> = text.lines().next().unwrap().split(' ').collect();
        assert_eq!(first.len(), 10);
        assert_eq!(first[9], "-9999");
    }
}
