//! Stimvis renders audio-visualization videos in bounded-memory segments.
//!
//! The export pipeline turns an arbitrarily long audio file into a
//! frame-accurate animated visualization, encoded one segment at a time by the
//! system `ffmpeg` binary and losslessly reassembled at the end:
//!
//! 1. **Plan**: `PlanConfig -> FramePlan` (ordered segments covering the
//!    frame timeline, optionally led by a preview segment)
//! 2. **Resolve**: `FramePlan + resume point + filesystem probe -> RunState`
//!    (which segments remain, which prior files are reused)
//! 3. **Render**: one blocking `ffmpeg` child per pending segment, fed RGBA8
//!    frames over stdin, every segment ending on a forced keyframe
//! 4. **Assemble**: concat-demuxer (stream copy by default) plus the original
//!    audio track, `+faststart`, then tag/cover metadata
//!
//! Segment files live at deterministic paths, so an interrupted export can be
//! resumed with an explicit frame or segment. Intermediates are tracked by a
//! [`TempFileLedger`] and removed only after the final container succeeds.
//!
//! Audio decoding, frame rendering, and tag writing are collaborator traits
//! ([`AudioSource`], [`VideoVisualization`], [`MetadataSink`]); minimal
//! `ffprobe`/`ffmpeg`-backed implementations are provided.
#![forbid(unsafe_code)]

pub mod assemble;
pub mod core;
pub mod encode;
pub mod error;
pub mod export;
pub mod files;
pub mod ledger;
pub mod media;
pub mod plan;
pub mod probe;
pub mod progress;
pub mod resume;
pub mod viz;

pub use assemble::{AssembleRequest, assemble, assemble_args, concat_manifest};
pub use core::{FrameIndex, FrameRange};
pub use encode::{
    EncoderSettings, SegmentEncoder, composite_preview, is_ffmpeg_on_path, is_ffprobe_on_path,
    preview_composite_args, segment_encode_args,
};
pub use error::{StimvisError, StimvisResult};
pub use export::{
    ImageExportOptions, PreviewOptions, VideoExportOptions, export_image, export_video,
};
pub use files::{SegmentLayout, output_file_base, resolve_output_path};
pub use ledger::TempFileLedger;
pub use media::{
    AudioSource, AudioTags, DiscardMetadata, Frame, FrameSpec, MetadataSink, VideoVisualization,
    Visualization,
};
pub use plan::{FramePlan, PlanConfig, PlannedSegment, PreviewConfig, SegmentId};
pub use probe::{FfmpegMetadataWriter, FfprobeAudio, metadata_remux_args};
pub use progress::{ProgressReporter, seconds_to_string};
pub use resume::{ResumePoint, RunState, resolve_run_state, segment_file_ready};
pub use viz::SweepVisualization;
