use std::time::{Duration, Instant};

const BAR_WIDTH: u64 = 24;

/// Weight given to the latest cumulative per-frame average when folding it
/// into the smoothed estimate.
const SMOOTHING: f64 = 0.3;

/// Throughput/ETA estimator fed by per-frame completion callbacks.
///
/// Purely observational: it never fails, and arithmetic edge cases (no frames
/// yet, zero elapsed time) render as unknown placeholders instead of faulting
/// the render loop. One reporter is owned by a single export invocation; state
/// never leaks across runs.
#[derive(Debug)]
pub struct ProgressReporter {
    frames_total: u64,
    frames_before_segment: u64,
    segment_label: String,
    segment_frames: u64,
    segment_started: Instant,
    smoothed_frame_secs: Option<f64>,
}

impl ProgressReporter {
    pub fn new(frames_total: u64) -> Self {
        Self {
            frames_total,
            frames_before_segment: 0,
            segment_label: String::new(),
            segment_frames: 0,
            segment_started: Instant::now(),
            smoothed_frame_secs: None,
        }
    }

    /// Start tracking a segment of `segment_frames` frames, with
    /// `frames_before` timeline frames already accounted for by earlier
    /// segments (rendered now or reused from a previous run).
    pub fn begin_segment(&mut self, label: impl Into<String>, frames_before: u64, segment_frames: u64) {
        self.segment_label = label.into();
        self.frames_before_segment = frames_before;
        self.segment_frames = segment_frames;
        self.segment_started = Instant::now();
        self.smoothed_frame_secs = None;
    }

    /// Record that frame `i` of the current segment finished (1-based) and
    /// render the progress line.
    pub fn frame_done(&mut self, i: u64) -> String {
        self.frame_done_at(i, self.segment_started.elapsed())
    }

    /// Clock-injected form of [`ProgressReporter::frame_done`].
    pub fn frame_done_at(&mut self, i: u64, elapsed: Duration) -> String {
        let n = self.segment_frames;
        let elapsed_secs = elapsed.as_secs_f64();

        if i > 0 && elapsed_secs > 0.0 {
            let average = elapsed_secs / i as f64;
            self.smoothed_frame_secs = Some(match self.smoothed_frame_secs {
                None => average,
                Some(prev) => SMOOTHING * average + (1.0 - SMOOTHING) * prev,
            });
        }

        let overall = self.frames_before_segment.saturating_add(i);
        let bar = render_bar(i, n);

        let (segment_eta, total_eta, fps) = match self.smoothed_frame_secs {
            Some(per_frame) if per_frame > 0.0 => {
                let segment_remaining = n.saturating_sub(i) as f64 * per_frame;
                let total_remaining =
                    self.frames_total.saturating_sub(overall) as f64 * per_frame;
                (
                    seconds_to_string(segment_remaining),
                    seconds_to_string(total_remaining),
                    format!("{:.1}", 1.0 / per_frame),
                )
            }
            _ => ("--:--".to_string(), "--:--".to_string(), "--".to_string()),
        };

        format!(
            "{} [{}] {}/{} ({}/{}) elapsed {} eta {} total {} {} fps",
            self.segment_label,
            bar,
            i,
            n,
            overall,
            self.frames_total,
            seconds_to_string(elapsed_secs),
            segment_eta,
            total_eta,
            fps,
        )
    }
}

fn render_bar(i: u64, n: u64) -> String {
    let filled = if n == 0 {
        0
    } else {
        (i.min(n) * BAR_WIDTH) / n
    };
    let mut bar = String::with_capacity(BAR_WIDTH as usize);
    for pos in 0..BAR_WIDTH {
        bar.push(if pos < filled { '#' } else { '-' });
    }
    bar
}

/// Format a duration in seconds as `m:ss`, `h:mm:ss`, or `d:hh:mm:ss`.
pub fn seconds_to_string(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{days}:{hours:02}:{minutes:02}:{secs:02}")
    } else if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
