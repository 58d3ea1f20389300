use std::path::{Path, PathBuf};

use crate::plan::SegmentId;

/// Deterministic temp-file naming for one export run.
///
/// Paths are stable functions of `(base, segment id, format)` so a later
/// invocation can find the segment files a previous run left behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentLayout {
    temp_dir: PathBuf,
    base: String,
    video_format: String,
    image_format: String,
}

impl SegmentLayout {
    pub fn new(
        temp_dir: impl Into<PathBuf>,
        base: impl Into<String>,
        video_format: impl Into<String>,
        image_format: impl Into<String>,
    ) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            base: base.into(),
            video_format: video_format.into(),
            image_format: image_format.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn segment_path(&self, id: SegmentId) -> PathBuf {
        self.temp_dir.join(format!(
            "{}_{}.{}",
            self.base,
            id.file_suffix(),
            self.video_format
        ))
    }

    /// Scratch output for the preview overlay composite; renamed over the raw
    /// preview segment once the composite encoder succeeds.
    pub fn preview_composite_path(&self) -> PathBuf {
        self.temp_dir
            .join(format!("{}_preview_composite.{}", self.base, self.video_format))
    }

    pub fn preview_still_path(&self) -> PathBuf {
        self.temp_dir
            .join(format!("{}-videopreview.{}", self.base, self.image_format))
    }

    /// Overview still rendered for the embedded cover-art tag.
    pub fn cover_still_path(&self) -> PathBuf {
        self.temp_dir
            .join(format!("{}-cover.{}", self.base, self.image_format))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.temp_dir.join(format!("{}.txt", self.base))
    }
}

/// Derive the output file base name from an explicit output path (directory or
/// file) and the audio source path, mirroring how the output file itself is
/// resolved: a directory output means "name the file after the audio input".
pub fn output_file_base(output_path: Option<&Path>, audio_path: &Path) -> String {
    if let Some(out) = output_path
        && !out.is_dir()
        && let Some(stem) = out.file_stem()
        && !stem.is_empty()
    {
        return stem.to_string_lossy().into_owned();
    }
    audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Resolve the final output file path for the given format.
pub fn resolve_output_path(output_path: Option<&Path>, audio_path: &Path, format: &str) -> PathBuf {
    let base = output_file_base(output_path, audio_path);
    let dir = match output_path {
        Some(out) if out.is_dir() => out.to_path_buf(),
        Some(out) => out
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        None => PathBuf::from("."),
    };
    dir.join(format!("{base}.{format}"))
}
