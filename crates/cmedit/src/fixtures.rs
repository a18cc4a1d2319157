//! Factory functions for creating test data.
//!
//! Provides small sounding tables and cm text used by unit tests, the
//! integration tests and scripted sessions.

use shared::{RowId, FLAG_UNSET};

use crate::table::{CmRecord, PointTable};

// ── Record factories ────────────────────────────────────────────

/// A sounding with neutral uncertainty columns and no flag.
pub fn record(row: u32, cm_id: i64, lon: f64, lat: f64, depth: f64, ml_score: f64) -> CmRecord {
    CmRecord {
        row_id: RowId(row),
        cm_id,
        lon,
        lat,
        depth,
        sig_h: 1.0,
        sig_d: 0.5,
        source_id: 7,
        predicted_depth: depth,
        ml_score,
        flag: FLAG_UNSET,
        metadata: Vec::new(),
    }
}

// ── Table factories ─────────────────────────────────────────────

/// One row per score, cm ids 1..=n, spread over a small non-collinear patch.
pub fn scored_table(scores: &[f64]) -> PointTable {
    let rows = scores
        .iter()
        .enumerate()
        .map(|(i, &score)| {
            let lon = 10.0 + 0.1 * i as f64;
            let lat = 45.0 + 0.05 * (i % 2) as f64;
            let depth = -(100.0 + 10.0 * i as f64);
            record(i as u32, i as i64 + 1, lon, lat, depth, score)
        })
        .collect();
    PointTable::from_records(rows)
}

/// Rows at the given `(lon, lat, depth)`, cm ids 1..=n, score 0.5.
pub fn table_from_points(points: &[(f64, f64, f64)]) -> PointTable {
    let rows = points
        .iter()
        .enumerate()
        .map(|(i, &(lon, lat, depth))| record(i as u32, i as i64 + 1, lon, lat, depth, 0.5))
        .collect();
    PointTable::from_records(rows)
}

/// ML scores of the [`zigzag_table`] rows.
pub const ZIGZAG_SCORES: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];

/// Five soundings at lon 0..=4 with lat alternating 0/1, all at depth -1000.
/// cm ids 1..=5.
pub fn zigzag_table() -> PointTable {
    let rows = (0..5u32)
        .map(|i| {
            let lon = i as f64;
            let lat = (i % 2) as f64;
            record(i, i as i64 + 1, lon, lat, -1000.0, ZIGZAG_SCORES[i as usize])
        })
        .collect();
    PointTable::from_records(rows)
}

// ── cm text ─────────────────────────────────────────────────────

/// A raw 9-column line, as produced by the classifier before any edit.
pub fn cm_line(cm_id: i64, lon: f64, lat: f64, depth: f64, ml_score: f64) -> String {
    format!("{cm_id} {lon} {lat} {depth} 1.0 0.5 7 {depth} {ml_score}")
}

/// [`zigzag_table`] as unflagged cm text.
pub fn zigzag_cm() -> String {
    (0..5u32)
        .map(|i| {
            let score = ZIGZAG_SCORES[i as usize];
            cm_line(i as i64 + 1, i as f64, (i % 2) as f64, -1000.0, score) + "\n"
        })
        .collect()
}
