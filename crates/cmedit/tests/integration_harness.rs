//! Integration tests for EditorHarness.
//!
//! Drives the editor the way the event loop does: load, pick, edit, save.

use std::collections::BTreeSet;

use cmedit_lib::error::{EditorError, MeshError};
use cmedit_lib::fixtures;
use cmedit_lib::harness::EditorHarness;
use cmedit_lib::state::EditOutcome;
use cmedit_lib::surface::SurfaceToggle;
use cmedit_lib::table::PointTable;
use cmedit_lib::viewport::selector::PickMode;
use glam::DVec2;
use shared::{RowId, ScoreThresholds};

fn zigzag() -> EditorHarness {
    let mut h = EditorHarness::new();
    h.load_cm_str(&fixtures::zigzag_cm()).unwrap();
    h
}

/// Select the two lat-1 soundings (cm ids 2 and 4).
fn pick_upper_row(h: &mut EditorHarness) -> usize {
    if h.viewport.mode() != PickMode::Picking {
        h.toggle_picking().unwrap();
    }
    h.pick_world_rect(DVec2::new(0.5, 1.5), DVec2::new(3.5, 0.5))
        .unwrap()
}

fn cm_ids(table: &PointTable) -> Vec<i64> {
    table.rows().iter().map(|r| r.cm_id).collect()
}

#[test]
fn test_partition_five_rows() {
    let mut h = EditorHarness::new();
    h.load_table(fixtures::scored_table(&[0.1, 0.4, 0.6, 0.9, 0.3]));
    assert_eq!(h.session().unwrap().thresholds(), ScoreThresholds::new(0.3, 0.6));

    let part = h.partition().unwrap();
    let table = h.session().unwrap().table();
    let ids = |set: &BTreeSet<RowId>| -> Vec<i64> {
        set.iter().map(|id| table.get(*id).unwrap().cm_id).collect()
    };
    assert_eq!(ids(&part.bad), vec![1, 5]);
    assert_eq!(ids(&part.uncertain), vec![2]);
    assert_eq!(ids(&part.good), vec![3, 4]);

    let clusters = h.map_clusters().unwrap();
    let sizes: Vec<usize> = clusters.iter().map(|c| c.points.len()).collect();
    assert_eq!(sizes, vec![2, 1, 2]);
}

#[test]
fn test_pick_delete_save_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("edited.cm");

    let mut h = zigzag();
    assert_eq!(pick_upper_row(&mut h), 2);
    assert_eq!(h.delete().unwrap(), EditOutcome::Applied { rows: 2 });
    h.save(&out).unwrap();

    let saved = PointTable::read_file(&out).unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(cm_ids(&saved), vec![1, 3, 5]);
}

#[test]
fn test_camera_stable_across_edits() {
    let mut h = zigzag();
    let before = h.viewport.camera().snapshot();

    pick_upper_row(&mut h);
    h.flag().unwrap();
    assert_eq!(h.viewport.camera().snapshot(), before);

    pick_upper_row(&mut h);
    h.delete().unwrap();
    assert_eq!(h.viewport.camera().snapshot(), before);

    h.rescale(1.0, 1.0, 20.0).unwrap();
    assert_eq!(h.viewport.camera().snapshot(), before);
    h.render().unwrap();
    assert_eq!(h.viewport.camera().snapshot(), before);
}

#[test]
fn test_rescale_refits_outline() {
    let mut h = zigzag();
    let before = *h.viewport.outline().unwrap();
    h.rescale(2.0, 1.0, 1.0).unwrap();
    let after = *h.viewport.outline().unwrap();
    assert_eq!(after.max.x, before.max.x * 2.0);
    assert_eq!(after.max.y, before.max.y);
}

#[test]
fn test_selection_never_contains_deleted_rows() {
    let mut h = zigzag();
    pick_upper_row(&mut h);
    h.delete().unwrap();

    let size = h.viewport.size();
    let picked = h.pick_rect(DVec2::ZERO, size).unwrap();
    assert_eq!(picked, 3);

    let session = h.session().unwrap();
    let selection = session.selection().unwrap();
    let present: BTreeSet<RowId> = session.cloud().unwrap().row_ids().iter().copied().collect();
    assert!(selection.row_ids().is_subset(&present));
    assert!(!selection.contains(RowId(1)));
    assert!(!selection.contains(RowId(3)));
}

#[test]
fn test_flag_keeps_points_and_marks_rows() {
    let mut h = zigzag();
    pick_upper_row(&mut h);
    assert!(h.key('f').unwrap().is_some());

    let session = h.session().unwrap();
    assert_eq!(session.table().flagged_count(), 2);
    assert_eq!(session.cloud().unwrap().len(), session.table().len());
    assert!(session.highlight().is_none());

    // second flag has nothing highlighted
    assert_eq!(h.flag().unwrap(), EditOutcome::NoSelection);
}

#[test]
fn test_flag_is_idempotent() {
    let mut once = fixtures::zigzag_table();
    let ids: BTreeSet<RowId> = [RowId(0), RowId(4)].into_iter().collect();
    once.apply_flag(&ids, shared::FLAG_EXCLUDED);
    let mut twice = once.clone();
    twice.apply_flag(&ids, shared::FLAG_EXCLUDED);
    assert_eq!(once, twice);
}

#[test]
fn test_failed_triangulation_leaves_mesh() {
    let mut h = zigzag();
    assert_eq!(h.toggle_surface().unwrap(), SurfaceToggle::Built { triangles: 3 });

    // keep only two soundings
    h.toggle_picking().unwrap();
    h.pick_world_rect(DVec2::new(-0.5, 1.5), DVec2::new(2.5, -0.5))
        .unwrap();
    h.delete().unwrap();
    assert_eq!(h.row_count(), 2);

    let err = h.toggle_surface().unwrap_err();
    assert!(matches!(err, EditorError::Mesh(MeshError::TooFewPoints { count: 2 })));
    let surface = h.session().unwrap().surface();
    assert!(surface.is_stale());
    assert_eq!(surface.mesh().unwrap().triangle_count(), 3);

    let frame = h.render().unwrap();
    assert_eq!(frame.points, 2);
    assert_eq!(frame.surface_triangles, Some(3));
}

#[test]
fn test_surface_over_scattered_soundings_fills_hull() {
    // low-discrepancy scatter over a long, narrow survey strip
    let points: Vec<(f64, f64, f64)> = (0..60)
        .map(|i| {
            let i = i as f64;
            let lon = 100.0 * (i * 0.618_033_988_75).fract();
            let lat = 0.5 * (i * 0.754_877_666_25).fract();
            (lon, lat, -1000.0 - 5.0 * i)
        })
        .collect();
    let mut h = EditorHarness::new();
    h.load_table(fixtures::table_from_points(&points));
    h.toggle_surface().unwrap();

    let validator = h.validate_surface().unwrap();
    let errors = validator.validate_all();
    assert!(errors.is_empty(), "Expected no errors, got: {:?}", errors);
    assert!(validator.covers_hull(1e-9));
}

#[test]
fn test_leaving_picking_drops_highlight() {
    let mut h = zigzag();
    pick_upper_row(&mut h);
    assert_eq!(h.selected_count(), 2);
    assert_eq!(h.toggle_picking().unwrap(), PickMode::Idle);
    assert_eq!(h.selected_count(), 0);
    assert_eq!(h.delete().unwrap(), EditOutcome::NoSelection);
    assert_eq!(h.row_count(), 5);
}
