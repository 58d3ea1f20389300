use std::fs;

use stimvis::{
    FramePlan, PlanConfig, PreviewConfig, ResumePoint, SegmentId, SegmentLayout, StimvisError,
    resolve_run_state, segment_file_ready,
};

fn plan() -> FramePlan {
    FramePlan::build(&PlanConfig {
        duration_secs: 125.0,
        fps: 30.0,
        segment_secs: 60.0,
        preview: Some(PreviewConfig {
            length_secs: 10.0,
            fade_secs: 5.0,
        }),
    })
    .unwrap()
}

#[test]
fn resume_against_real_segment_files() {
    let plan = plan();
    let dir = tempfile::tempdir().unwrap();
    let layout = SegmentLayout::new(dir.path(), "track", "mp4", "png");

    fs::write(layout.segment_path(SegmentId::Preview), b"preview").unwrap();
    fs::write(layout.segment_path(SegmentId::Index(1)), b"one").unwrap();

    let state = resolve_run_state(&plan, &layout, Some(ResumePoint::Segment(2)), segment_file_ready)
        .unwrap();

    let pending: Vec<_> = state.pending.iter().map(|s| s.id).collect();
    assert_eq!(pending, vec![SegmentId::Index(2), SegmentId::Index(3)]);
    for (_, path) in &state.completed_files {
        assert!(path.is_file(), "{}", path.display());
    }
}

#[test]
fn resume_fails_when_a_prior_file_was_deleted() {
    let plan = plan();
    let dir = tempfile::tempdir().unwrap();
    let layout = SegmentLayout::new(dir.path(), "track", "mp4", "png");

    // Preview exists, segment 1 does not.
    fs::write(layout.segment_path(SegmentId::Preview), b"preview").unwrap();

    let err =
        resolve_run_state(&plan, &layout, Some(ResumePoint::Segment(2)), segment_file_ready)
            .unwrap_err();
    match err {
        StimvisError::Resume(msg) => assert!(msg.contains("track_1.mp4"), "{msg}"),
        other => panic!("expected resume error, got {other}"),
    }
}

#[test]
fn empty_partial_segment_file_fails_resume() {
    let plan = plan();
    let dir = tempfile::tempdir().unwrap();
    let layout = SegmentLayout::new(dir.path(), "track", "mp4", "png");

    // An interrupted run can leave a segment file the encoder opened but
    // never wrote to; it must not count as complete.
    fs::write(layout.segment_path(SegmentId::Preview), b"preview").unwrap();
    fs::write(layout.segment_path(SegmentId::Index(1)), b"").unwrap();

    let err =
        resolve_run_state(&plan, &layout, Some(ResumePoint::Segment(2)), segment_file_ready)
            .unwrap_err();
    match err {
        StimvisError::Resume(msg) => assert!(msg.contains("track_1.mp4"), "{msg}"),
        other => panic!("expected resume error, got {other}"),
    }
}

#[test]
fn directory_probe_does_not_count_as_a_segment_file() {
    let plan = plan();
    let dir = tempfile::tempdir().unwrap();
    let layout = SegmentLayout::new(dir.path(), "track", "mp4", "png");

    // A stray directory at a segment path must not satisfy the probe.
    fs::create_dir(layout.segment_path(SegmentId::Preview)).unwrap();

    let err =
        resolve_run_state(&plan, &layout, Some(ResumePoint::Segment(1)), segment_file_ready)
            .unwrap_err();
    assert!(matches!(err, StimvisError::Resume(_)));
}
