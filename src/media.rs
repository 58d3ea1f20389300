use std::{collections::BTreeMap, path::Path};

use crate::{
    core::FrameIndex,
    error::{StimvisError, StimvisResult},
};

/// One rendered image: straight (non-premultiplied) RGBA8, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn check_dims(&self, width: u32, height: u32) -> StimvisResult<()> {
        if self.width != width || self.height != height {
            return Err(StimvisError::encoding(format!(
                "frame size mismatch: got {}x{}, expected {width}x{height}",
                self.width, self.height
            )));
        }
        if self.data.len() != (width as usize) * (height as usize) * 4 {
            return Err(StimvisError::encoding(
                "frame data length mismatch with width*height*4",
            ));
        }
        Ok(())
    }
}

/// Audio tags as read from the source container, preserved verbatim.
pub type AudioTags = BTreeMap<String, String>;

/// Decoded-audio collaborator: the core only needs the duration, the source
/// path (merged into the final container) and the tag map.
pub trait AudioSource {
    fn duration_secs(&self) -> f64;
    fn source_path(&self) -> &Path;
    fn tags(&self) -> AudioTags;
}

/// Everything the video renderer needs to produce one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSpec {
    pub index: FrameIndex,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Whole-file overview renderer (used for image export and cover art).
pub trait Visualization {
    fn render_still(&self, width: u32, height: u32) -> StimvisResult<Frame>;
}

/// Per-frame animation renderer driven by the segment loop.
pub trait VideoVisualization: Visualization {
    fn render_frame(&mut self, spec: &FrameSpec) -> StimvisResult<Frame>;
}

/// Tag/cover writer applied to the final container after assembly.
pub trait MetadataSink {
    fn write_tags(
        &self,
        video_path: &Path,
        tags: &AudioTags,
        cover_image: Option<&Path>,
    ) -> StimvisResult<()>;
}

/// Sink for callers that skip the tagging post-step entirely.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardMetadata;

impl MetadataSink for DiscardMetadata {
    fn write_tags(
        &self,
        _video_path: &Path,
        _tags: &AudioTags,
        _cover_image: Option<&Path>,
    ) -> StimvisResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_frame_has_expected_layout() {
        let f = Frame::filled(2, 3, [1, 2, 3, 255]);
        assert_eq!(f.data.len(), 2 * 3 * 4);
        assert_eq!(&f.data[..4], &[1, 2, 3, 255]);
        f.check_dims(2, 3).unwrap();
    }

    #[test]
    fn check_dims_rejects_mismatch() {
        let f = Frame::filled(2, 2, [0; 4]);
        assert!(f.check_dims(2, 3).is_err());
    }
}
