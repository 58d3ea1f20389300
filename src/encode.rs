use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    error::{StimvisError, StimvisResult},
    media::Frame,
    plan::SegmentId,
};

/// Per-segment encoder configuration shared by every ffmpeg invocation in a
/// run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
    pub pix_fmt: String,
    /// User-supplied codec arguments, passed through verbatim as a structured
    /// argument vector (never interpolated into shell text).
    pub extra_args: Vec<String>,
}

impl EncoderSettings {
    pub fn validate(&self) -> StimvisResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StimvisError::configuration(
                "encode width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // Default settings target yuv420p output for maximum compatibility.
            return Err(StimvisError::configuration(
                "encode width/height must be even (required for yuv420p output)",
            ));
        }
        if !(self.fps > 0.0) || !self.fps.is_finite() {
            return Err(StimvisError::configuration("encode fps must be > 0"));
        }
        if self.codec.is_empty() {
            return Err(StimvisError::configuration("encode codec must be set"));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    tool_responds("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    tool_responds("ffprobe")
}

fn tool_responds(name: &str) -> bool {
    Command::new(name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Argument vector for encoding one segment from rawvideo frames on stdin.
///
/// The `-force_key_frames` expression pins the segment's final frame as a
/// keyframe so the assembler can concatenate segments by stream copy without
/// artifacts at the joins.
pub fn segment_encode_args(
    settings: &EncoderSettings,
    frame_count: u64,
    out_path: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", settings.width, settings.height),
        "-r".into(),
        settings.fps.to_string(),
        "-i".into(),
        "pipe:0".into(),
        "-an".into(),
        "-c:v".into(),
        settings.codec.clone(),
    ];
    args.extend(settings.extra_args.iter().cloned());
    args.push("-force_key_frames".into());
    args.push(format!("expr:eq(n,{})", frame_count.saturating_sub(1)));
    args.push("-pix_fmt".into());
    args.push(settings.pix_fmt.clone());
    args.push(out_path.to_string_lossy().into_owned());
    args
}

/// Filter-graph invocation that composites the faded preview still over the
/// raw preview segment. The overlay is active only during
/// `[0, preview_secs)`, with an alpha fade over its last `fade_secs`.
pub fn preview_composite_args(
    settings: &EncoderSettings,
    raw_segment: &Path,
    still_image: &Path,
    preview_secs: f64,
    fade_secs: f64,
    frame_count: u64,
    out_path: &Path,
) -> Vec<String> {
    let fade_start = (preview_secs - fade_secs).max(0.0);
    let filter = format!(
        "[1:v]fade=t=out:st={fade_start}:d={fade_secs}:alpha=1[faded];\
         [0:v][faded]overlay=0:0:enable='between(t,0,{preview_secs})'[outv]"
    );

    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        raw_segment.to_string_lossy().into_owned(),
        "-loop".into(),
        "1".into(),
        "-t".into(),
        preview_secs.to_string(),
        "-i".into(),
        still_image.to_string_lossy().into_owned(),
        "-filter_complex".into(),
        filter,
        "-map".into(),
        "[outv]".into(),
        "-an".into(),
        "-r".into(),
        settings.fps.to_string(),
        "-c:v".into(),
        settings.codec.clone(),
    ];
    args.extend(settings.extra_args.iter().cloned());
    // The composite re-encodes, so the keyframe pin must be re-applied.
    args.push("-force_key_frames".into());
    args.push(format!("expr:eq(n,{})", frame_count.saturating_sub(1)));
    args.push("-pix_fmt".into());
    args.push(settings.pix_fmt.clone());
    args.push(out_path.to_string_lossy().into_owned());
    args
}

/// Run a blocking ffmpeg invocation with no stdin, returning the trimmed
/// stderr tail on a non-zero exit. Callers wrap the message in the error
/// variant for their stage.
pub(crate) fn run_ffmpeg(args: &[String]) -> Result<(), String> {
    let output = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| format!("failed to spawn ffmpeg (is it installed and on PATH?): {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "ffmpeg exited with status {}: {}",
            output.status,
            tail(stderr.trim(), 500)
        ));
    }
    Ok(())
}

fn tail(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth_back(max_chars.saturating_sub(1)) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// One blocking ffmpeg child encoding a single segment file from RGBA8 frames
/// streamed over stdin.
pub struct SegmentEncoder {
    id: SegmentId,
    settings: EncoderSettings,
    out_path: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
}

impl SegmentEncoder {
    pub fn spawn(
        settings: &EncoderSettings,
        id: SegmentId,
        frame_count: u64,
        out_path: &Path,
    ) -> StimvisResult<Self> {
        settings.validate()?;
        if frame_count == 0 {
            return Err(StimvisError::encoding(format!(
                "{id}: cannot encode a zero-frame segment"
            )));
        }

        let args = segment_encode_args(settings, frame_count, out_path);
        // stderr is not drained until finish(); -loglevel error must keep its
        // volume under the pipe buffer while frames stream into stdin.
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                StimvisError::encoding(format!(
                    "{id}: failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StimvisError::encoding(format!("{id}: failed to open ffmpeg stdin")))?;

        Ok(Self {
            id,
            settings: settings.clone(),
            out_path: out_path.to_path_buf(),
            child,
            stdin: Some(stdin),
        })
    }

    pub fn write_frame(&mut self, frame: &Frame) -> StimvisResult<()> {
        frame.check_dims(self.settings.width, self.settings.height)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(StimvisError::encoding(format!(
                "{}: encoder is already finalized",
                self.id
            )));
        };

        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            StimvisError::encoding(format!(
                "{}: failed to write frame to ffmpeg stdin: {e}",
                self.id
            ))
        })
    }

    /// Close stdin, wait for the encoder, and confirm the segment file landed.
    pub fn finish(mut self) -> StimvisResult<PathBuf> {
        drop(self.stdin.take());

        let output = self.child.wait_with_output().map_err(|e| {
            StimvisError::encoding(format!(
                "{}: failed to wait for ffmpeg to finish: {e}",
                self.id
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StimvisError::encoding(format!(
                "{}: ffmpeg exited with status {}: {}",
                self.id,
                output.status,
                tail(stderr.trim(), 500)
            )));
        }

        Ok(self.out_path)
    }
}

/// Composite the preview still over the raw preview segment and atomically
/// replace the segment file with the result.
pub fn composite_preview(
    settings: &EncoderSettings,
    segment_path: &Path,
    still_image: &Path,
    scratch_path: &Path,
    preview_secs: f64,
    fade_secs: f64,
    frame_count: u64,
) -> StimvisResult<()> {
    let args = preview_composite_args(
        settings,
        segment_path,
        still_image,
        preview_secs,
        fade_secs,
        frame_count,
        scratch_path,
    );
    run_ffmpeg(&args)
        .map_err(|e| StimvisError::encoding(format!("preview composite failed: {e}")))?;

    std::fs::rename(scratch_path, segment_path).map_err(|e| {
        StimvisError::encoding(format!(
            "failed to replace '{}' with composited preview: {e}",
            segment_path.display()
        ))
    })
}
