use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    encode::run_ffmpeg,
    error::{StimvisError, StimvisResult},
    media::{AudioSource, AudioTags, MetadataSink},
};

/// `AudioSource` backed by the system `ffprobe` binary: duration and container
/// tags are read once at open time.
#[derive(Clone, Debug)]
pub struct FfprobeAudio {
    path: PathBuf,
    duration_secs: f64,
    tags: AudioTags,
}

#[derive(serde::Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: AudioTags,
}

impl FfprobeAudio {
    pub fn open(path: impl Into<PathBuf>) -> StimvisResult<Self> {
        let path = path.into();
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration:format_tags",
                "-of",
                "json",
            ])
            .arg(&path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                StimvisError::configuration(format!(
                    "failed to run ffprobe (is it installed and on PATH?): {e}"
                ))
            })?;

        if !output.status.success() {
            return Err(StimvisError::configuration(format!(
                "ffprobe could not read '{}': {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let parsed = parse_probe_json(&output.stdout)
            .with_context(|| format!("parse ffprobe output for '{}'", path.display()))?;

        let duration_secs = parsed
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| {
                StimvisError::configuration(format!(
                    "ffprobe reported no duration for '{}'",
                    path.display()
                ))
            })?;

        Ok(Self {
            path,
            duration_secs,
            tags: parsed.format.tags,
        })
    }
}

fn parse_probe_json(bytes: &[u8]) -> anyhow::Result<ProbeOutput> {
    Ok(serde_json::from_slice(bytes)?)
}

impl AudioSource for FfprobeAudio {
    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    fn source_path(&self) -> &Path {
        &self.path
    }

    fn tags(&self) -> AudioTags {
        self.tags.clone()
    }
}

/// `MetadataSink` that remuxes the finished container with `-c copy`, merging
/// in the source tags and attaching the cover image as an `attached_pic`
/// stream, then atomically replaces the original file.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegMetadataWriter;

/// Argument vector for the tag/cover remux.
pub fn metadata_remux_args(
    video_path: &Path,
    tags: &AudioTags,
    cover_image: Option<&Path>,
    out_path: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        video_path.to_string_lossy().into_owned(),
    ];

    if let Some(cover) = cover_image {
        args.extend(["-i".into(), cover.to_string_lossy().into_owned()]);
    }

    args.extend(["-map".into(), "0".into()]);
    if cover_image.is_some() {
        args.extend(["-map".into(), "1".into()]);
    }
    args.extend(["-c".into(), "copy".into()]);
    if cover_image.is_some() {
        // Cover stills are re-encoded to mjpeg, the conventional attached_pic
        // codec for mp4/m4a containers.
        args.extend([
            "-c:v:1".into(),
            "mjpeg".into(),
            "-disposition:v:1".into(),
            "attached_pic".into(),
        ]);
    }

    for (key, value) in tags {
        args.push("-metadata".into());
        args.push(format!("{key}={value}"));
    }

    args.extend(["-movflags".into(), "+faststart".into()]);
    args.push(out_path.to_string_lossy().into_owned());
    args
}

impl MetadataSink for FfmpegMetadataWriter {
    fn write_tags(
        &self,
        video_path: &Path,
        tags: &AudioTags,
        cover_image: Option<&Path>,
    ) -> StimvisResult<()> {
        let file_name = video_path
            .file_name()
            .ok_or_else(|| {
                StimvisError::metadata(format!(
                    "video path '{}' has no file name",
                    video_path.display()
                ))
            })?
            .to_string_lossy()
            .into_owned();
        let scratch = video_path.with_file_name(format!(".{file_name}.tagged"));
        // ffmpeg infers the muxer from the extension; keep it at the end.
        let scratch = scratch.with_extension(
            video_path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "mp4".to_string()),
        );

        let args = metadata_remux_args(video_path, tags, cover_image, &scratch);
        // The scratch file sits outside the export's ledger, so both failure
        // paths have to unlink it here.
        run_ffmpeg(&args).map_err(|e| {
            let _ = std::fs::remove_file(&scratch);
            StimvisError::metadata(format!(
                "failed to write tags to '{}': {e}",
                video_path.display()
            ))
        })?;

        std::fs::rename(&scratch, video_path).map_err(|e| {
            let _ = std::fs::remove_file(&scratch);
            StimvisError::metadata(format!(
                "failed to replace '{}' with tagged copy: {e}",
                video_path.display()
            ))
        })
    }
}
