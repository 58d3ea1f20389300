use stimvis::{FramePlan, PlanConfig, PreviewConfig, ResumePoint, SegmentId, SegmentLayout,
    resolve_run_state};

fn build(duration: f64, fps: f64, segment: f64, preview: Option<(f64, f64)>) -> FramePlan {
    FramePlan::build(&PlanConfig {
        duration_secs: duration,
        fps,
        segment_secs: segment,
        preview: preview.map(|(length_secs, fade_secs)| PreviewConfig {
            length_secs,
            fade_secs,
        }),
    })
    .unwrap()
}

fn layout() -> SegmentLayout {
    SegmentLayout::new("/tmp/stimvis-test", "track", "mp4", "png")
}

#[test]
fn ranges_cover_timeline_for_a_sweep_of_configs() {
    let durations = [0.5, 1.0, 13.7, 59.9, 60.0, 61.0, 125.0, 600.0, 3599.99];
    let fpss = [10.0, 24.0, 29.97, 30.0, 60.0];
    let segments = [1.0, 10.0, 60.0, 300.0];

    for &duration in &durations {
        for &fps in &fpss {
            for &segment in &segments {
                for preview in [None, Some((0.5f64, 0.25)), Some((1.0, 1.0))] {
                    if let Some((length, _)) = preview
                        && segment < length.min(duration)
                    {
                        continue;
                    }
                    let plan = build(duration, fps, segment, preview);
                    let mut next = 0u64;
                    for seg in &plan.segments {
                        assert_eq!(
                            seg.range.start.0, next,
                            "gap/overlap at {} (d={duration} fps={fps} s={segment})",
                            seg.id
                        );
                        assert!(!seg.range.is_empty());
                        assert!(seg.range.len_frames() <= plan.frames_per_segment.max(plan.preview_frames));
                        next = seg.range.end.0;
                    }
                    assert_eq!(next, plan.frames_total);
                }
            }
        }
    }
}

#[test]
fn numeric_ids_are_contiguous_from_one() {
    let plan = build(600.0, 30.0, 45.0, Some((5.0, 2.0)));
    let mut expected = 1u32;
    for seg in &plan.segments {
        if let SegmentId::Index(n) = seg.id {
            assert_eq!(n, expected);
            expected += 1;
        }
    }
    assert!(expected > 2);
}

#[test]
fn resume_by_frame_agrees_with_resume_by_segment_across_plans() {
    for preview in [None, Some((10.0, 5.0))] {
        let plan = build(125.0, 30.0, 60.0, preview);
        for seg in &plan.segments {
            let SegmentId::Index(n) = seg.id else { continue };
            for frame in [
                seg.range.start.0,
                (seg.range.start.0 + seg.range.end.0) / 2,
                seg.range.end.0 - 1,
            ] {
                if frame < plan.preview_frames {
                    continue;
                }
                let by_frame =
                    resolve_run_state(&plan, &layout(), Some(ResumePoint::Frame(frame)), |_| true)
                        .unwrap();
                let by_segment =
                    resolve_run_state(&plan, &layout(), Some(ResumePoint::Segment(n)), |_| true)
                        .unwrap();
                let a: Vec<_> = by_frame.pending.iter().map(|s| s.id).collect();
                let b: Vec<_> = by_segment.pending.iter().map(|s| s.id).collect();
                assert_eq!(a, b, "frame {frame} vs segment {n} (preview={preview:?})");
            }
        }
    }
}

#[test]
fn completed_files_are_ordered_preview_first_then_ascending() {
    let plan = build(250.0, 30.0, 60.0, Some((10.0, 5.0)));
    let state = resolve_run_state(&plan, &layout(), Some(ResumePoint::Segment(3)), |_| true).unwrap();
    let ids: Vec<_> = state.completed_files.iter().map(|(id, _)| *id).collect();
    assert_eq!(
        ids,
        vec![SegmentId::Preview, SegmentId::Index(1), SegmentId::Index(2)]
    );
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}
