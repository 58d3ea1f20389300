use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use stimvis::{
    AudioSource as _, FfmpegMetadataWriter, FfprobeAudio, ImageExportOptions, PreviewOptions,
    SweepVisualization, VideoExportOptions, export_image, export_video, is_ffmpeg_on_path,
    is_ffprobe_on_path,
};

#[derive(Parser, Debug)]
#[command(name = "stimvis", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a still-image visualization of an audio file.
    Image(ImageArgs),
    /// Write an animated visualization video (requires `ffmpeg` and
    /// `ffprobe` on PATH).
    Video(VideoArgs),
}

#[derive(Parser, Debug)]
struct ImageArgs {
    /// Input audio file.
    #[arg(short = 'i', long = "in")]
    in_path: PathBuf,

    /// Output file or directory (directory derives the name from the input).
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,

    /// Image format (by extension).
    #[arg(long, default_value = "png")]
    format: String,

    #[arg(long, default_value_t = 2048)]
    width: u32,

    #[arg(long, default_value_t = 1024)]
    height: u32,
}

#[derive(Parser, Debug)]
struct VideoArgs {
    /// Input audio file.
    #[arg(short = 'i', long = "in")]
    in_path: PathBuf,

    /// Output file or directory (directory derives the name from the input).
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,

    /// Export options JSON; command-line flags override it.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Container format (by extension).
    #[arg(long)]
    format: Option<String>,

    #[arg(long)]
    fps: Option<f64>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Segment length in seconds.
    #[arg(long)]
    segment_secs: Option<f64>,

    /// Video codec passed to the encoder.
    #[arg(long)]
    codec: Option<String>,

    /// Disable the faded preview lead-in.
    #[arg(long, default_value_t = false)]
    no_preview: bool,

    /// Re-encode segments during final concatenation instead of stream copy.
    #[arg(long, default_value_t = false)]
    reencode: bool,

    /// Frame on which to resume an interrupted export.
    #[arg(long, conflicts_with = "resume_segment")]
    resume_frame: Option<u64>,

    /// Segment on which to resume an interrupted export. Requires the same
    /// segment length as the interrupted run.
    #[arg(long)]
    resume_segment: Option<u32>,

    /// Directory for intermediate segment files (stable across resumes).
    #[arg(long)]
    temp_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Image(args) => cmd_image(args),
        Command::Video(args) => cmd_video(args),
    }
}

fn cmd_image(args: ImageArgs) -> anyhow::Result<()> {
    if !is_ffprobe_on_path() {
        anyhow::bail!("ffprobe not found; make sure FFmpeg is installed and on PATH");
    }

    let audio = FfprobeAudio::open(&args.in_path)
        .with_context(|| format!("open audio '{}'", args.in_path.display()))?;
    let viz = SweepVisualization::new(audio.duration_secs());

    let opts = ImageExportOptions {
        output_path: args.out,
        image_format: args.format,
        width: args.width,
        height: args.height,
    };
    let out = export_image(&audio, &viz, &opts)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_video(args: VideoArgs) -> anyhow::Result<()> {
    if !is_ffmpeg_on_path() || !is_ffprobe_on_path() {
        anyhow::bail!("ffmpeg/ffprobe not found; make sure FFmpeg is installed and on PATH");
    }

    let mut opts = match &args.opts {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read options '{}'", path.display()))?;
            serde_json::from_str::<VideoExportOptions>(&text)
                .with_context(|| format!("parse options '{}'", path.display()))?
        }
        None => VideoExportOptions::default(),
    };

    if args.out.is_some() {
        opts.output_path = args.out;
    }
    if let Some(format) = args.format {
        opts.video_format = format;
    }
    if let Some(fps) = args.fps {
        opts.fps = fps;
    }
    if let Some(width) = args.width {
        opts.width = width;
    }
    if let Some(height) = args.height {
        opts.height = height;
    }
    if let Some(segment_secs) = args.segment_secs {
        opts.segment_secs = segment_secs;
    }
    if let Some(codec) = args.codec {
        opts.codec = codec;
    }
    if args.no_preview {
        opts.preview = PreviewOptions {
            enabled: false,
            ..opts.preview
        };
    }
    if args.reencode {
        opts.reencode_segments = true;
    }
    if args.resume_frame.is_some() {
        opts.resume_frame = args.resume_frame;
    }
    if args.resume_segment.is_some() {
        opts.resume_segment = args.resume_segment;
    }
    if args.temp_dir.is_some() {
        opts.temp_dir = args.temp_dir;
    }

    let audio = FfprobeAudio::open(&args.in_path)
        .with_context(|| format!("open audio '{}'", args.in_path.display()))?;
    let mut viz = SweepVisualization::new(audio.duration_secs());

    let out = export_video(&audio, &mut viz, &FfmpegMetadataWriter, &opts)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
