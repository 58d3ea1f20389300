use std::path::PathBuf;

use crate::{
    assemble::{AssembleRequest, assemble},
    core::FrameIndex,
    encode::{EncoderSettings, SegmentEncoder, composite_preview, is_ffmpeg_on_path},
    error::{StimvisError, StimvisResult},
    files::{SegmentLayout, output_file_base, resolve_output_path},
    ledger::TempFileLedger,
    media::{AudioSource, Frame, FrameSpec, MetadataSink, VideoVisualization, Visualization},
    plan::{FramePlan, PlanConfig, PreviewConfig, SegmentId},
    progress::ProgressReporter,
    resume::{ResumePoint, resolve_run_state, segment_file_ready},
};

/// Preview lead-in clip settings.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreviewOptions {
    pub enabled: bool,
    pub length_secs: f64,
    pub fade_secs: f64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            length_secs: 10.0,
            fade_secs: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoExportOptions {
    /// Output file or directory; a directory (or `None`, meaning the current
    /// directory) derives the file name from the audio input.
    pub output_path: Option<PathBuf>,
    pub video_format: String,
    pub image_format: String,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub segment_secs: f64,
    pub codec: String,
    pub extra_encoder_args: Vec<String>,
    pub preview: PreviewOptions,
    /// Re-encode the video stream during final concatenation instead of
    /// stream copying.
    pub reencode_segments: bool,
    pub resume_frame: Option<u64>,
    pub resume_segment: Option<u32>,
    /// Directory for segment files and other intermediates; defaults to the
    /// system temp dir. Must be stable across runs for resume to work.
    pub temp_dir: Option<PathBuf>,
}

impl Default for VideoExportOptions {
    fn default() -> Self {
        Self {
            output_path: None,
            video_format: "mp4".to_string(),
            image_format: "png".to_string(),
            fps: 30.0,
            width: 1920,
            height: 1080,
            segment_secs: 60.0,
            codec: "libx264".to_string(),
            extra_encoder_args: Vec::new(),
            preview: PreviewOptions::default(),
            reencode_segments: false,
            resume_frame: None,
            resume_segment: None,
            temp_dir: None,
        }
    }
}

impl VideoExportOptions {
    pub fn validate(&self) -> StimvisResult<()> {
        if self.resume_frame.is_some() && self.resume_segment.is_some() {
            return Err(StimvisError::configuration(
                "resume frame and resume segment are mutually exclusive",
            ));
        }
        self.encoder_settings().validate()
    }

    pub fn resume_point(&self) -> Option<ResumePoint> {
        match (self.resume_frame, self.resume_segment) {
            (Some(frame), _) => Some(ResumePoint::Frame(frame)),
            (_, Some(segment)) => Some(ResumePoint::Segment(segment)),
            (None, None) => None,
        }
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            width: self.width,
            height: self.height,
            fps: self.fps,
            codec: self.codec.clone(),
            pix_fmt: "yuv420p".to_string(),
            extra_args: self.extra_encoder_args.clone(),
        }
    }

    pub fn plan_config(&self, duration_secs: f64) -> PlanConfig {
        PlanConfig {
            duration_secs,
            fps: self.fps,
            segment_secs: self.segment_secs,
            preview: self.preview.enabled.then_some(PreviewConfig {
                length_secs: self.preview.length_secs,
                fade_secs: self.preview.fade_secs,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ImageExportOptions {
    pub output_path: Option<PathBuf>,
    pub image_format: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ImageExportOptions {
    fn default() -> Self {
        Self {
            output_path: None,
            image_format: "png".to_string(),
            width: 2048,
            height: 1024,
        }
    }
}

/// Render the whole-file overview still and write it as an image file.
pub fn export_image(
    audio: &dyn AudioSource,
    viz: &dyn Visualization,
    opts: &ImageExportOptions,
) -> StimvisResult<PathBuf> {
    let out_path = resolve_output_path(
        opts.output_path.as_deref(),
        audio.source_path(),
        &opts.image_format,
    );
    let frame = viz.render_still(opts.width, opts.height)?;
    write_image_file(&frame, &out_path, &opts.image_format)?;
    Ok(out_path)
}

fn write_image_file(frame: &Frame, out_path: &std::path::Path, format: &str) -> StimvisResult<()> {
    let format = image::ImageFormat::from_extension(format).ok_or_else(|| {
        StimvisError::configuration(format!("unsupported image format '{format}'"))
    })?;
    image::save_buffer_with_format(
        out_path,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        format,
    )
    .map_err(|e| {
        StimvisError::encoding(format!("failed to write image '{}': {e}", out_path.display()))
    })
}

/// Render the audio's animated visualization to a video file with the original
/// audio track merged in, in bounded-memory segments.
///
/// Segment files are written to deterministic paths under the temp dir, so an
/// interrupted run can be resumed with `resume_frame` or `resume_segment`. On
/// success every intermediate file is removed; on failure they are left in
/// place for the next attempt.
#[tracing::instrument(skip_all)]
pub fn export_video(
    audio: &dyn AudioSource,
    viz: &mut dyn VideoVisualization,
    metadata: &dyn MetadataSink,
    opts: &VideoExportOptions,
) -> StimvisResult<PathBuf> {
    opts.validate()?;
    if !is_ffmpeg_on_path() {
        return Err(StimvisError::configuration(
            "ffmpeg is required for video export, but was not found on PATH",
        ));
    }

    let settings = opts.encoder_settings();
    let plan = FramePlan::build(&opts.plan_config(audio.duration_secs()))?;

    let base = output_file_base(opts.output_path.as_deref(), audio.source_path());
    let out_path = resolve_output_path(
        opts.output_path.as_deref(),
        audio.source_path(),
        &opts.video_format,
    );

    let temp_dir = opts
        .temp_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&temp_dir).map_err(|e| {
        StimvisError::configuration(format!(
            "failed to create temp directory '{}': {e}",
            temp_dir.display()
        ))
    })?;
    let layout = SegmentLayout::new(&temp_dir, &base, &opts.video_format, &opts.image_format);

    let mut state = resolve_run_state(&plan, &layout, opts.resume_point(), segment_file_ready)?;

    tracing::info!(
        frames_total = plan.frames_total,
        segments = plan.segments.len(),
        pending = state.pending.len(),
        out = %out_path.display(),
        "starting video export"
    );

    // Register every intermediate this run can create or reuse up front, so a
    // resumed run also cleans up what an interrupted one left behind.
    let mut ledger = TempFileLedger::new();
    for (_, path) in &state.completed_files {
        ledger.register(path);
    }
    ledger.register(layout.manifest_path());
    if plan.has_preview() {
        ledger.register(layout.preview_still_path());
        ledger.register(layout.preview_composite_path());
    }

    // Overview still, embedded later as the cover-art tag.
    let cover_path = layout.cover_still_path();
    let cover = viz.render_still(opts.width, opts.height)?;
    write_image_file(&cover, &cover_path, &opts.image_format)?;
    ledger.register(&cover_path);

    let preview_pending = state.pending.iter().any(|s| s.id == SegmentId::Preview);
    if preview_pending {
        let still = viz.render_still(opts.width, opts.height)?;
        write_image_file(&still, &layout.preview_still_path(), &opts.image_format)?;
    }

    let mut reporter = ProgressReporter::new(plan.frames_total);
    let print_every = (opts.fps.round().max(1.0)) as u64;
    let last_index = plan.last_index();

    for segment in state.pending.clone() {
        let frame_count = segment.range.len_frames();
        let label = match segment.id {
            SegmentId::Preview => "preview".to_string(),
            SegmentId::Index(n) => format!("segment {n}/{last_index}"),
        };
        tracing::info!(segment = %segment.id, frames = frame_count, "rendering segment");
        reporter.begin_segment(&label, segment.range.start.0, frame_count);

        let segment_path = layout.segment_path(segment.id);
        ledger.register(&segment_path);

        let mut encoder =
            SegmentEncoder::spawn(&settings, segment.id, frame_count, &segment_path)?;
        for f in segment.range.start.0..segment.range.end.0 {
            let frame = viz.render_frame(&FrameSpec {
                index: FrameIndex(f),
                width: opts.width,
                height: opts.height,
                fps: opts.fps,
            })?;
            encoder.write_frame(&frame)?;

            // The reporter sees every frame; only the terminal line is
            // throttled.
            let i = f - segment.range.start.0 + 1;
            let line = reporter.frame_done(i);
            if i % print_every == 0 || i == frame_count {
                eprint!("\r{line}");
            }
        }
        let segment_path = encoder.finish()?;
        eprintln!();

        if segment.id == SegmentId::Preview {
            composite_preview(
                &settings,
                &segment_path,
                &layout.preview_still_path(),
                &layout.preview_composite_path(),
                plan.preview_secs,
                plan.fade_secs,
                frame_count,
            )?;
        }

        state.mark_rendered(segment.id, segment_path);
    }

    assemble(
        &AssembleRequest {
            segment_files: &state.completed_files,
            audio_path: audio.source_path(),
            out_path: &out_path,
            manifest_path: &layout.manifest_path(),
            settings: &settings,
            reencode_segments: opts.reencode_segments,
        },
        &mut ledger,
    )?;

    tracing::info!(out = %out_path.display(), "writing metadata tags");
    metadata.write_tags(&out_path, &audio.tags(), Some(&cover_path))?;

    ledger.drain();
    tracing::info!(out = %out_path.display(), "export complete");
    Ok(out_path)
}
