use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shared::RowId;

/// Row ids picked by one gesture (frustum or polygon).
///
/// Always refers to rows by id, never by table position, so it stays valid
/// while the table is rebuilt around it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    row_ids: BTreeSet<RowId>,
}

impl Selection {
    pub fn new(row_ids: BTreeSet<RowId>) -> Self {
        Self { row_ids }
    }

    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.row_ids.contains(&id)
    }

    /// Ids in ascending order
    pub fn row_ids(&self) -> &BTreeSet<RowId> {
        &self.row_ids
    }

    pub fn iter(&self) -> impl Iterator<Item = RowId> + '_ {
        self.row_ids.iter().copied()
    }
}

impl FromIterator<RowId> for Selection {
    fn from_iter<I: IntoIterator<Item = RowId>>(iter: I) -> Self {
        Self {
            row_ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_dedups_and_orders() {
        let sel: Selection = [RowId(4), RowId(1), RowId(4)].into_iter().collect();
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![RowId(1), RowId(4)]);
    }
}
