use crate::{
    core::{FrameIndex, FrameRange},
    error::{StimvisError, StimvisResult},
};

/// Identity of one independently-encoded slice of the output timeline.
///
/// `Preview` (when present) always sorts before every numeric segment; numeric
/// segments are contiguous starting at 1. The derived `Ord` relies on variant
/// declaration order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum SegmentId {
    Preview,
    Index(u32),
}

impl SegmentId {
    /// Suffix used in the deterministic segment file name.
    pub fn file_suffix(self) -> String {
        match self {
            SegmentId::Preview => "preview".to_string(),
            SegmentId::Index(n) => n.to_string(),
        }
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentId::Preview => write!(f, "preview"),
            SegmentId::Index(n) => write!(f, "segment {n}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlannedSegment {
    pub id: SegmentId,
    pub range: FrameRange,
}

/// Preview lead-in settings, in seconds of timeline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreviewConfig {
    pub length_secs: f64,
    pub fade_secs: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlanConfig {
    pub duration_secs: f64,
    pub fps: f64,
    pub segment_secs: f64,
    pub preview: Option<PreviewConfig>,
}

impl PlanConfig {
    pub fn validate(&self) -> StimvisResult<()> {
        if !(self.duration_secs > 0.0) || !self.duration_secs.is_finite() {
            return Err(StimvisError::configuration(
                "audio duration must be a positive, finite number of seconds",
            ));
        }
        if !(self.fps > 0.0) || !self.fps.is_finite() {
            return Err(StimvisError::configuration("fps must be > 0"));
        }
        if !(self.segment_secs > 0.0) || !self.segment_secs.is_finite() {
            return Err(StimvisError::configuration("segment length must be > 0"));
        }
        if let Some(preview) = &self.preview {
            if preview.length_secs < 0.0 || preview.fade_secs < 0.0 {
                return Err(StimvisError::configuration(
                    "preview length and fade length must be >= 0",
                ));
            }
            if preview.fade_secs > preview.length_secs {
                return Err(StimvisError::configuration(
                    "preview fade length must not exceed preview length",
                ));
            }
        }
        Ok(())
    }
}

/// Immutable frame plan: ordered segments covering `[0, frames_total)` with no
/// gaps and no overlaps.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FramePlan {
    pub fps: f64,
    pub frames_total: u64,
    pub frames_per_segment: u64,
    pub preview_frames: u64,
    pub preview_secs: f64,
    pub fade_secs: f64,
    pub segments: Vec<PlannedSegment>,
}

impl FramePlan {
    pub fn build(cfg: &PlanConfig) -> StimvisResult<Self> {
        cfg.validate()?;

        let frames_total = (cfg.duration_secs * cfg.fps).floor() as u64;
        if frames_total == 0 {
            return Err(StimvisError::configuration(format!(
                "audio of {:.3}s at {} fps produces no frames",
                cfg.duration_secs, cfg.fps
            )));
        }

        let frames_per_segment = (cfg.segment_secs * cfg.fps).floor() as u64;
        if frames_per_segment == 0 {
            return Err(StimvisError::configuration(format!(
                "segment length of {:.3}s at {} fps produces no frames per segment",
                cfg.segment_secs, cfg.fps
            )));
        }

        let (preview_secs, fade_secs) = match &cfg.preview {
            Some(preview) if preview.length_secs > 0.0 => {
                let preview_secs = preview.length_secs.min(cfg.duration_secs);
                if cfg.segment_secs < preview_secs {
                    // The overlay composite must finish within one segment window.
                    return Err(StimvisError::configuration(format!(
                        "segment length ({:.3}s) must be at least the preview length ({:.3}s)",
                        cfg.segment_secs, preview_secs
                    )));
                }
                (preview_secs, preview.fade_secs.min(preview_secs))
            }
            _ => (0.0, 0.0),
        };
        let preview_frames = (preview_secs * cfg.fps).floor() as u64;

        let mut segments = Vec::new();
        if preview_frames > 0 {
            segments.push(PlannedSegment {
                id: SegmentId::Preview,
                range: FrameRange::new(FrameIndex(0), FrameIndex(preview_frames.min(frames_total)))?,
            });
        }

        let mut start = preview_frames.min(frames_total);
        let mut index = 1u32;
        while start < frames_total {
            let end = (start + frames_per_segment).min(frames_total);
            segments.push(PlannedSegment {
                id: SegmentId::Index(index),
                range: FrameRange::new(FrameIndex(start), FrameIndex(end))?,
            });
            start = end;
            index = index
                .checked_add(1)
                .ok_or_else(|| StimvisError::configuration("segment count overflow"))?;
        }

        Ok(Self {
            fps: cfg.fps,
            frames_total,
            frames_per_segment,
            preview_frames,
            preview_secs,
            fade_secs,
            segments,
        })
    }

    pub fn has_preview(&self) -> bool {
        self.preview_frames > 0
    }

    /// Highest numeric segment index in the plan (0 when there is none).
    pub fn last_index(&self) -> u32 {
        self.segments
            .iter()
            .filter_map(|s| match s.id {
                SegmentId::Index(n) => Some(n),
                SegmentId::Preview => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn segment(&self, id: SegmentId) -> Option<&PlannedSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Translate a timeline frame to the numeric segment that should be resumed.
    ///
    /// Frames inside the preview window resume at segment 1; the preview is
    /// never resumed into mid-way.
    pub fn resume_segment_for_frame(&self, frame: u64) -> u32 {
        if frame <= self.preview_frames {
            return 1;
        }
        ((frame - self.preview_frames) / self.frames_per_segment + 1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(duration: f64, fps: f64, segment: f64, preview: Option<(f64, f64)>) -> FramePlan {
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

    fn assert_covers(plan: &FramePlan) {
        let mut next = 0u64;
        for seg in &plan.segments {
            assert_eq!(seg.range.start.0, next, "gap or overlap at {}", seg.id);
            assert!(!seg.range.is_empty(), "empty segment {}", seg.id);
            next = seg.range.end.0;
        }
        assert_eq!(next, plan.frames_total);
    }

    #[test]
    fn two_minute_track_without_preview() {
        let p = plan(125.0, 30.0, 60.0, None);
        assert_eq!(p.frames_total, 3750);
        assert_eq!(p.frames_per_segment, 1800);
        let ids: Vec<_> = p.segments.iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![SegmentId::Index(1), SegmentId::Index(2), SegmentId::Index(3)]
        );
        assert_eq!(p.segments[0].range, FrameRange::new(FrameIndex(0), FrameIndex(1800)).unwrap());
        assert_eq!(
            p.segments[1].range,
            FrameRange::new(FrameIndex(1800), FrameIndex(3600)).unwrap()
        );
        assert_eq!(
            p.segments[2].range,
            FrameRange::new(FrameIndex(3600), FrameIndex(3750)).unwrap()
        );
        assert_covers(&p);
    }

    #[test]
    fn two_minute_track_with_preview() {
        let p = plan(125.0, 30.0, 60.0, Some((10.0, 5.0)));
        assert_eq!(p.preview_frames, 300);
        assert_eq!(p.segments[0].id, SegmentId::Preview);
        assert_eq!(p.segments[0].range, FrameRange::new(FrameIndex(0), FrameIndex(300)).unwrap());
        assert_eq!(p.segments[1].id, SegmentId::Index(1));
        assert_eq!(p.segments[1].range.start.0, 300);
        assert_covers(&p);
    }

    #[test]
    fn plans_cover_timeline_without_gaps() {
        for (duration, fps, segment) in [
            (1.0, 30.0, 60.0),
            (59.99, 24.0, 10.0),
            (60.0, 30.0, 60.0),
            (3600.5, 29.97, 120.0),
            (0.2, 30.0, 1.0),
        ] {
            assert_covers(&plan(duration, fps, segment, None));
            assert_covers(&plan(duration, fps, segment, Some((0.1, 0.05))));
        }
    }

    #[test]
    fn exact_multiple_duration_has_no_empty_tail_segment() {
        let p = plan(120.0, 30.0, 60.0, None);
        assert_eq!(p.frames_total, 3600);
        assert_eq!(p.last_index(), 2);
        assert_covers(&p);
    }

    #[test]
    fn preview_longer_than_segment_is_rejected() {
        let err = FramePlan::build(&PlanConfig {
            duration_secs: 125.0,
            fps: 30.0,
            segment_secs: 5.0,
            preview: Some(PreviewConfig {
                length_secs: 10.0,
                fade_secs: 2.0,
            }),
        })
        .unwrap_err();
        assert!(matches!(err, StimvisError::Configuration(_)));
    }

    #[test]
    fn preview_is_clamped_to_short_audio() {
        // 3s of audio with a 10s preview: preview shrinks to the whole file.
        let p = plan(3.0, 30.0, 60.0, Some((10.0, 5.0)));
        assert_eq!(p.preview_secs, 3.0);
        assert_eq!(p.preview_frames, 90);
        assert_eq!(p.fade_secs, 3.0);
        assert_covers(&p);
    }

    #[test]
    fn fade_longer_than_preview_is_rejected() {
        let err = FramePlan::build(&PlanConfig {
            duration_secs: 125.0,
            fps: 30.0,
            segment_secs: 60.0,
            preview: Some(PreviewConfig {
                length_secs: 2.0,
                fade_secs: 3.0,
            }),
        })
        .unwrap_err();
        assert!(matches!(err, StimvisError::Configuration(_)));
    }

    #[test]
    fn zero_frame_plans_are_rejected() {
        for cfg in [
            PlanConfig {
                duration_secs: 0.0,
                fps: 30.0,
                segment_secs: 60.0,
                preview: None,
            },
            PlanConfig {
                duration_secs: 0.01,
                fps: 30.0,
                segment_secs: 60.0,
                preview: None,
            },
            PlanConfig {
                duration_secs: 10.0,
                fps: 30.0,
                segment_secs: 0.01,
                preview: None,
            },
        ] {
            assert!(FramePlan::build(&cfg).is_err());
        }
    }

    #[test]
    fn preview_sorts_before_numeric_segments() {
        assert!(SegmentId::Preview < SegmentId::Index(1));
        assert!(SegmentId::Index(1) < SegmentId::Index(2));
    }

    #[test]
    fn resume_segment_for_frame_matches_ranges() {
        let p = plan(125.0, 30.0, 60.0, Some((10.0, 5.0)));
        // Preview window lands on segment 1.
        assert_eq!(p.resume_segment_for_frame(0), 1);
        assert_eq!(p.resume_segment_for_frame(299), 1);
        assert_eq!(p.resume_segment_for_frame(300), 1);
        assert_eq!(p.resume_segment_for_frame(2099), 1);
        assert_eq!(p.resume_segment_for_frame(2100), 2);
    }
}
