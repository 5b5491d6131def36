//! End-to-end layout: session text to render plans.

use trackview::model::RegionSource;
use trackview::session::parse_session_str;
use trackview::settings::Settings;
use trackview::view::{TrackPlan, TrackView};

const SESSION: &str = "
sequences:
  - { name: seq1, start: 0, end: 99, tss: 50 }
tracks:
  - kind: region
    name: motifs
    regions:
      seq1:
        - { start: 10, end: 29, type: a, strand: direct }
        - { start: 20, end: 39, type: b, strand: reverse }
        - { start: 50, end: 59, type: c }
  - kind: numeric
    name: conservation
    values:
      seq1: [0.5, 1.0, 0.25]
";

fn view() -> TrackView {
    let store = parse_session_str(SESSION).unwrap().build_store(|| false).unwrap();
    TrackView::new(store, Settings::default(), 100.0)
}

#[test]
fn contracted_then_expanded() {
    let mut view = view();
    assert_eq!(view.track_height("motifs", "seq1"), 4.0);

    let clip = view.clip_window("seq1", 0.0, 4.0).unwrap();
    let output = view.plan_visible_regions("motifs", "seq1", &clip);
    assert_eq!(output.plans.len(), 3);
    assert!(!output.failed);
    let a = &output.plans[0];
    assert_eq!(a.bounds.x, 10.0);
    assert_eq!(a.bounds.width, 20.0);

    view.set_expanded("motifs", true);
    assert_eq!(view.track_height("motifs", "seq1"), 2.0);

    let clip = view.clip_window("seq1", 0.0, 2.0).unwrap();
    let output = view.plan_visible_regions("motifs", "seq1", &clip);
    let rows: Vec<f64> = output.plans.iter().map(|p| p.bounds.y).collect();
    assert_eq!(rows, vec![0.0, 1.0, 0.0]);

    // Only the first row is inside the band
    let clip = view.clip_window("seq1", 0.0, 1.0).unwrap();
    assert_eq!(view.plan_visible_regions("motifs", "seq1", &clip).plans.len(), 2);
}

#[test]
fn moving_a_region_repacks_rows() {
    let mut view = view();
    view.set_expanded("motifs", true);
    assert_eq!(view.track_height("motifs", "seq1"), 2.0);

    let ids = view.store().region_ids("motifs", "seq1");
    assert!(view.move_region(ids[2], 25, 35));
    assert_eq!(view.track_height("motifs", "seq1"), 3.0);
}

#[test]
fn flipped_orientation_mirrors_regions() {
    let mut view = view();
    view.flip_orientation("seq1");

    let clip = view.clip_window("seq1", 0.0, 4.0).unwrap();
    let output = view.plan_visible_regions("motifs", "seq1", &clip);
    assert_eq!(output.plans[0].bounds.x, 70.0);
    assert_eq!(output.plans[0].bounds.width, 20.0);
    assert_eq!(output.plans[0].direction.arrow(), '<');
}

#[test]
fn zoomed_view_skips_offscreen_regions() {
    let mut view = view();
    view.set_viewport("seq1", 0, 14);

    let clip = view.clip_window("seq1", 0.0, 4.0).unwrap();
    let output = view.plan_visible_regions("motifs", "seq1", &clip);
    assert_eq!(output.plans.len(), 1);
    assert_eq!(output.plans[0].kind, "a");
}

#[test]
fn numeric_track_has_one_column_per_value() {
    let mut view = view();
    let clip = view.clip_window("seq1", 0.0, 4.0).unwrap();
    match view.plan_track("conservation", "seq1", &clip) {
        Some(TrackPlan::Numeric(columns)) => {
            assert_eq!(columns.len(), 3);
            assert_eq!(columns[1].value, 1.0);
            assert_eq!(columns[1].height, 4.0);
        }
        other => panic!("unexpected plan {:?}", other),
    }
}
