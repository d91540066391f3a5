//! External transcoding capability.
//!
//! The pipeline only depends on the [`Transcoder`] trait; the production
//! implementation shells out to `ffmpeg`/`ffprobe`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Offset used when a percentage position cannot be resolved.
const FALLBACK_FRAME_SECS: f64 = 1.0;
const MAX_STDERR_CHARS: usize = 600;

/// Where in the source a still frame is taken.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FramePosition {
    /// Percentage of the total duration (0-100).
    Percent(u8),
    /// Absolute offset in seconds.
    Seconds(f64),
}

/// Extract one still frame to an image file.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    pub position: FramePosition,
    pub width: u32,
    pub height: u32,
}

/// Extract a short, re-encoded clip.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    pub start_secs: f64,
    pub duration_secs: f64,
    pub width: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to run {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("transcoder exited with {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
    #[error("transcoder produced no output at {0:?}")]
    NoOutput(PathBuf),
}

/// Asynchronous media operations used by the artifact pipeline.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Write a single still frame of `req.source` to `req.target`.
    async fn extract_frame(&self, req: &FrameRequest) -> Result<(), TranscodeError>;
    /// Write a short clip of `req.source` to `req.target`.
    async fn extract_clip(&self, req: &ClipRequest) -> Result<(), TranscodeError>;
    /// Duration of `source` in seconds, `None` when it cannot be determined.
    async fn read_duration(&self, source: &Path) -> Option<f64>;
}

/// [`Transcoder`] backed by the ffmpeg command line tools.
#[derive(Clone, Debug)]
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf) -> Self {
        Self { ffmpeg, ffprobe }
    }

    async fn run_to(&self, args: Vec<OsString>, partial: &Path, target: &Path) -> Result<(), TranscodeError> {
        let result = self.run(args).await.and_then(|()| {
            if partial.is_file() {
                std::fs::rename(partial, target).map_err(|_| TranscodeError::NoOutput(target.to_path_buf()))
            } else {
                Err(TranscodeError::NoOutput(target.to_path_buf()))
            }
        });
        if result.is_err() {
            let _ = std::fs::remove_file(partial);
        }
        result
    }

    async fn run(&self, args: Vec<OsString>) -> Result<(), TranscodeError> {
        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                program: self.ffmpeg.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(TranscodeError::Failed {
            status: output.status.code(),
            stderr: stderr.chars().take(MAX_STDERR_CHARS).collect(),
        })
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_frame(&self, req: &FrameRequest) -> Result<(), TranscodeError> {
        let offset = match req.position {
            FramePosition::Seconds(secs) => secs,
            FramePosition::Percent(pct) => match self.read_duration(&req.source).await {
                Some(total) => total * f64::from(pct.min(100)) / 100.0,
                None => FALLBACK_FRAME_SECS,
            },
        };
        let partial = partial_path(&req.target);
        self.run_to(frame_args(req, offset, &partial), &partial, &req.target)
            .await
    }

    async fn extract_clip(&self, req: &ClipRequest) -> Result<(), TranscodeError> {
        let partial = partial_path(&req.target);
        self.run_to(clip_args(req, &partial), &partial, &req.target)
            .await
    }

    async fn read_duration(&self, source: &Path) -> Option<f64> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// `name.jpg` -> `name.partial.jpg`; ffmpeg picks the muxer from the extension.
fn partial_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    target.with_file_name(name)
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

fn frame_args(req: &FrameRequest, offset_secs: f64, output: &Path) -> Vec<OsString> {
    let (w, h) = (req.width, req.height);
    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
    );
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-ss"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(format!("{offset_secs:.3}").into());
    args.push("-i".into());
    args.push(req.source.clone().into());
    for arg in ["-frames:v", "1", "-vf"] {
        args.push(arg.into());
    }
    args.push(filter.into());
    for arg in ["-q:v", "3"] {
        args.push(arg.into());
    }
    args.push(output.into());
    args
}

fn clip_args(req: &ClipRequest, output: &Path) -> Vec<OsString> {
    let bitrate = format!("{}k", req.bitrate_kbps);
    let bufsize = format!("{}k", req.bitrate_kbps.saturating_mul(2));
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-ss"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(format!("{:.3}", req.start_secs).into());
    args.push("-i".into());
    args.push(req.source.clone().into());
    args.push("-t".into());
    args.push(format!("{:.3}", req.duration_secs).into());
    args.push("-an".into());
    args.push("-vf".into());
    args.push(format!("scale={}:-2,fps={}", req.width, req.fps).into());
    for arg in ["-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p"] {
        args.push(arg.into());
    }
    args.push("-b:v".into());
    args.push(bitrate.clone().into());
    args.push("-maxrate".into());
    args.push(bitrate.into());
    args.push("-bufsize".into());
    args.push(bufsize.into());
    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push(output.into());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn partial_path_keeps_extension_last() {
        let partial = partial_path(Path::new("/tmp/art/Foo_c.jpg"));
        assert_eq!(partial, PathBuf::from("/tmp/art/Foo_c.partial.jpg"));
        let partial = partial_path(Path::new("/tmp/art/c_preview.mp4"));
        assert_eq!(partial, PathBuf::from("/tmp/art/c_preview.partial.mp4"));
    }

    #[test]
    fn parse_duration_reads_first_line() {
        assert_eq!(parse_duration("123.456000\n"), Some(123.456));
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn frame_args_seek_then_scale() {
        let req = FrameRequest {
            source: PathBuf::from("/media/a.mp4"),
            target: PathBuf::from("/art/a.jpg"),
            position: FramePosition::Seconds(2.0),
            width: 640,
            height: 360,
        };
        let args = as_strings(&frame_args(&req, 12.5, Path::new("/art/a.partial.jpg")));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "12.500");
        assert!(args.iter().any(|a| a.starts_with("scale=640:360")));
        assert_eq!(args.last().unwrap(), "/art/a.partial.jpg");
    }

    #[test]
    fn clip_args_drop_audio_and_cap_bitrate() {
        let req = ClipRequest {
            source: PathBuf::from("/media/a.mp4"),
            target: PathBuf::from("/art/a_preview.mp4"),
            start_secs: 10.0,
            duration_secs: 4.0,
            width: 320,
            fps: 15,
            bitrate_kbps: 400,
        };
        let args = as_strings(&clip_args(&req, Path::new("/art/a_preview.partial.mp4")));
        assert!(args.contains(&"-an".to_string()));
        assert!(args.contains(&"scale=320:-2,fps=15".to_string()));
        assert!(args.contains(&"400k".to_string()));
        assert!(args.contains(&"800k".to_string()));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "4.000");
    }

    #[actix_web::test]
    async fn missing_binary_reports_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(
            dir.path().join("no-such-ffmpeg"),
            dir.path().join("no-such-ffprobe"),
        );
        let req = FrameRequest {
            source: dir.path().join("a.mp4"),
            target: dir.path().join("a.jpg"),
            position: FramePosition::Percent(10),
            width: 64,
            height: 36,
        };
        let err = transcoder.extract_frame(&req).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Spawn { .. }));
        assert!(!dir.path().join("a.jpg").exists());
    }

    #[actix_web::test]
    async fn missing_ffprobe_yields_no_duration() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(
            dir.path().join("no-such-ffmpeg"),
            dir.path().join("no-such-ffprobe"),
        );
        assert_eq!(transcoder.read_duration(&dir.path().join("a.mp4")).await, None);
    }
}
