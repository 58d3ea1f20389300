use std::path::{Path, PathBuf};

use crate::{
    error::{StimvisError, StimvisResult},
    files::SegmentLayout,
    plan::{FramePlan, PlannedSegment, SegmentId},
};

/// Where a new invocation should pick up after an interrupted export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResumePoint {
    Frame(u64),
    Segment(u32),
}

/// Transient "what's left to do" view of a [`FramePlan`].
///
/// Built once per invocation; mutated only by [`RunState::mark_rendered`] as
/// segment files are confirmed on disk; discarded at process exit.
#[derive(Clone, Debug)]
pub struct RunState {
    pub pending: Vec<PlannedSegment>,
    pub completed_files: Vec<(SegmentId, PathBuf)>,
}

impl RunState {
    pub fn mark_rendered(&mut self, id: SegmentId, path: PathBuf) {
        self.completed_files.push((id, path));
    }
}

/// Filesystem probe for prior segment files: present and non-empty.
///
/// A run killed right after an encoder spawn can leave a zero-byte segment
/// file behind; treating it as complete would defer the failure to the concat
/// step. Content beyond that is not verified.
pub fn segment_file_ready(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Resolve which segments remain to be rendered and which prior segment files
/// this run will reuse.
///
/// The filesystem is consulted only through `exists`, which keeps the resolver
/// unit-testable without touching a real disk. Every segment before the resume
/// point must already have a file; the first missing one fails the whole
/// operation rather than silently re-rendering it, because a re-render could
/// mismatch an already-rendered neighbor.
pub fn resolve_run_state(
    plan: &FramePlan,
    layout: &SegmentLayout,
    resume: Option<ResumePoint>,
    exists: impl Fn(&Path) -> bool,
) -> StimvisResult<RunState> {
    let resume_index = match resume {
        None => {
            return Ok(RunState {
                pending: plan.segments.clone(),
                completed_files: Vec::new(),
            });
        }
        Some(ResumePoint::Frame(frame)) => {
            if frame >= plan.frames_total {
                return Err(StimvisError::configuration(format!(
                    "resume frame {frame} is beyond the final frame {}",
                    plan.frames_total.saturating_sub(1)
                )));
            }
            plan.resume_segment_for_frame(frame)
        }
        Some(ResumePoint::Segment(index)) => {
            if index == 0 {
                return Err(StimvisError::configuration(
                    "resume segment indices start at 1",
                ));
            }
            if index > plan.last_index() {
                return Err(StimvisError::configuration(format!(
                    "resume segment {index} is beyond the last segment {}",
                    plan.last_index()
                )));
            }
            index
        }
    };

    let mut pending = Vec::new();
    let mut completed_files = Vec::new();
    for segment in &plan.segments {
        let done = match segment.id {
            // The preview is only ever a dependency when resuming; it is never
            // resumed into mid-way.
            SegmentId::Preview => true,
            SegmentId::Index(n) => n < resume_index,
        };
        if done {
            let path = layout.segment_path(segment.id);
            if !exists(&path) {
                return Err(StimvisError::resume(format!(
                    "cannot resume at segment {resume_index}: {} file '{}' is missing; \
                     resume from an earlier point or restart from scratch",
                    segment.id,
                    path.display()
                )));
            }
            completed_files.push((segment.id, path));
        } else {
            pending.push(*segment);
        }
    }

    Ok(RunState {
        pending,
        completed_files,
    })
}
