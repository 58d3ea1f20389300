use crate::{
    error::StimvisResult,
    media::{Frame, FrameSpec, Visualization, VideoVisualization},
};

/// Minimal built-in visualization: a two-tone gradient backdrop with a
/// frame-accurate playhead column sweeping the timeline. It exists so the CLI
/// and the integration tests have a concrete renderer; anything prettier is a
/// job for a real visualization collaborator.
#[derive(Clone, Copy, Debug)]
pub struct SweepVisualization {
    duration_secs: f64,
}

const BACK_LO: [u8; 3] = [16, 12, 48];
const BACK_HI: [u8; 3] = [96, 24, 120];
const PLAYHEAD: [u8; 3] = [240, 240, 240];

impl SweepVisualization {
    pub fn new(duration_secs: f64) -> Self {
        Self { duration_secs }
    }

    fn backdrop(width: u32, height: u32) -> Frame {
        let mut frame = Frame::filled(width, height, [0, 0, 0, 255]);
        for y in 0..height {
            let t = if height > 1 {
                f64::from(y) / f64::from(height - 1)
            } else {
                0.0
            };
            for x in 0..width {
                let i = ((y as usize) * (width as usize) + (x as usize)) * 4;
                for c in 0..3 {
                    let lo = f64::from(BACK_LO[c]);
                    let hi = f64::from(BACK_HI[c]);
                    frame.data[i + c] = (lo + (hi - lo) * t).round() as u8;
                }
            }
        }
        frame
    }

    fn paint_column(frame: &mut Frame, x: u32, rgb: [u8; 3]) {
        for y in 0..frame.height {
            let i = ((y as usize) * (frame.width as usize) + (x as usize)) * 4;
            frame.data[i..i + 3].copy_from_slice(&rgb);
        }
    }
}

impl Visualization for SweepVisualization {
    fn render_still(&self, width: u32, height: u32) -> StimvisResult<Frame> {
        let mut frame = Self::backdrop(width, height);
        // Midline marker so the still is distinguishable from a video frame.
        let mid = height / 2;
        for x in 0..width {
            let i = ((mid as usize) * (width as usize) + (x as usize)) * 4;
            frame.data[i..i + 3].copy_from_slice(&PLAYHEAD);
        }
        Ok(frame)
    }
}

impl VideoVisualization for SweepVisualization {
    fn render_frame(&mut self, spec: &FrameSpec) -> StimvisResult<Frame> {
        let mut frame = Self::backdrop(spec.width, spec.height);
        let t = spec.index.0 as f64 / spec.fps;
        let progress = (t / self.duration_secs).clamp(0.0, 1.0);
        let x = ((progress * f64::from(spec.width.saturating_sub(1))).round() as u32)
            .min(spec.width.saturating_sub(1));
        Self::paint_column(&mut frame, x, PLAYHEAD);
        Ok(frame)
    }
}
