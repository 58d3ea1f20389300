use std::path::{Path, PathBuf};

use crate::{
    encode::{EncoderSettings, run_ffmpeg},
    error::{StimvisError, StimvisResult},
    ledger::TempFileLedger,
    plan::SegmentId,
};

/// Everything the assembler needs to produce the final container.
#[derive(Debug)]
pub struct AssembleRequest<'a> {
    pub segment_files: &'a [(SegmentId, PathBuf)],
    pub audio_path: &'a Path,
    pub out_path: &'a Path,
    pub manifest_path: &'a Path,
    pub settings: &'a EncoderSettings,
    /// Re-encode the video stream during concatenation instead of stream
    /// copying. Stream copy relies on every segment ending on a keyframe.
    pub reencode_segments: bool,
}

/// Concat-demuxer manifest body: one quoted `file` directive per segment.
pub fn concat_manifest(segment_files: &[(SegmentId, PathBuf)]) -> String {
    let mut out = String::new();
    for (_, path) in segment_files {
        let quoted = path.to_string_lossy().replace('\'', r"'\''");
        out.push_str(&format!("file '{quoted}'\n"));
    }
    out
}

/// Argument vector for the final concatenation/remux invocation.
///
/// Audio is always stream-copied; video is stream-copied unless
/// `reencode_segments` is set. `-strict -2` allows non-standard audio sample
/// rates; `+faststart` moves the index up front for progressive playback.
pub fn assemble_args(req: &AssembleRequest<'_>, use_manifest: bool) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
    ];

    if use_manifest {
        args.extend([
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            req.manifest_path.to_string_lossy().into_owned(),
        ]);
    } else {
        args.extend([
            "-i".into(),
            req.segment_files[0].1.to_string_lossy().into_owned(),
        ]);
    }

    args.extend([
        "-i".into(),
        req.audio_path.to_string_lossy().into_owned(),
        "-map".into(),
        "0:v".into(),
        "-map".into(),
        "1:a".into(),
    ]);

    if req.reencode_segments {
        args.extend(["-c:v".into(), req.settings.codec.clone()]);
        args.extend(req.settings.extra_args.iter().cloned());
        args.extend(["-pix_fmt".into(), req.settings.pix_fmt.clone()]);
    } else {
        args.extend(["-c:v".into(), "copy".into()]);
    }

    args.extend([
        "-c:a".into(),
        "copy".into(),
        "-strict".into(),
        "-2".into(),
        "-movflags".into(),
        "+faststart".into(),
    ]);
    args.push(req.out_path.to_string_lossy().into_owned());
    args
}

/// Concatenate the completed segment files and merge in the original audio
/// track, producing the final container at `req.out_path`.
///
/// A single segment with stream copy skips the manifest and remuxes directly.
/// On a non-zero encoder exit the partial output is left in place for
/// diagnosis and the segment files stay on disk for resume.
pub fn assemble(req: &AssembleRequest<'_>, ledger: &mut TempFileLedger) -> StimvisResult<()> {
    if req.segment_files.is_empty() {
        return Err(StimvisError::assembly("no segment files to assemble"));
    }

    let use_manifest = req.segment_files.len() > 1 || req.reencode_segments;
    if use_manifest {
        std::fs::write(req.manifest_path, concat_manifest(req.segment_files)).map_err(|e| {
            StimvisError::assembly(format!(
                "failed to write concat manifest '{}': {e}",
                req.manifest_path.display()
            ))
        })?;
        ledger.register(req.manifest_path);
    }

    tracing::info!(
        segments = req.segment_files.len(),
        reencode = req.reencode_segments,
        out = %req.out_path.display(),
        "assembling final video"
    );

    let args = assemble_args(req, use_manifest);
    run_ffmpeg(&args).map_err(|e| {
        StimvisError::assembly(format!(
            "failed to assemble '{}': {e}",
            req.out_path.display()
        ))
    })
}
