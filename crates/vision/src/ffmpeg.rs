//! FFmpeg/FFprobe frame extraction.
//!
//! Videos are probed with `ffprobe` for their first video stream, then decoded
//! by an `ffmpeg` child process that writes packed RGB24 frames to stdout.
//! The child is killed when the reader is dropped, so an early return, error,
//! or timeout never leaves a decoder running.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use armorsight_core::frame::RgbFrame;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;

use crate::source::{FrameSource, SourceOpener};

/// Cap on captured ffmpeg stderr.
const MAX_STDERR_BYTES: usize = 8 * 1024;

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("video file not found: {0}")]
    VideoNotFound(String),

    #[error("not a decodable video: {0}")]
    InvalidVideo(String),
}

impl FfmpegError {
    /// Whether the error is caused by the input file rather than the host.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            FfmpegError::VideoNotFound(_)
                | FfmpegError::InvalidVideo(_)
                | FfmpegError::ExecutionFailed { .. }
                | FfmpegError::ParseError(_)
        )
    }
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    pub format: Option<FfprobeFormat>,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub index: i32,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub nb_frames: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

/// Run `ffprobe` on a video file and return the parsed JSON output.
pub async fn probe_video(path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ));
    }

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Resolution of the first video stream, if it has a usable one.
pub fn parse_resolution(probe: &FfprobeOutput) -> Option<(u32, u32)> {
    let stream = first_video_stream(probe)?;
    match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some((w as u32, h as u32)),
        _ => None,
    }
}

/// Parse the video framerate from ffprobe output.
///
/// The `r_frame_rate` field is a fraction like `"30/1"` or `"24000/1001"`.
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    first_video_stream(probe)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(0.0)
}

/// Container-reported frame count of the first video stream, when present.
pub fn parse_frame_count(probe: &FfprobeOutput) -> Option<u64> {
    first_video_stream(probe)
        .and_then(|s| s.nb_frames.as_deref())
        .and_then(|n| n.parse::<u64>().ok())
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() == 2 {
        let num = parts[0].parse::<f64>().unwrap_or(0.0);
        let den = parts[1].parse::<f64>().unwrap_or(1.0);
        if den > 0.0 {
            return num / den;
        }
    }
    s.parse::<f64>().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Frame reader
// ---------------------------------------------------------------------------

/// Streams decoded RGB24 frames out of an `ffmpeg` child process.
pub struct FfmpegFrameReader {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    next_index: u64,
    done: bool,
}

impl FfmpegFrameReader {
    /// Probe `path` and start decoding its first video stream.
    ///
    /// `max_frames` stops decoding after that many frames.
    pub async fn open(path: &Path, max_frames: Option<u64>) -> Result<Self, FfmpegError> {
        let probe = probe_video(path).await?;
        let (width, height) = parse_resolution(&probe).ok_or_else(|| {
            FfmpegError::InvalidVideo(format!("{} has no video stream", path.display()))
        })?;

        tracing::debug!(
            path = %path.display(),
            width,
            height,
            fps = parse_framerate(&probe),
            frames = ?parse_frame_count(&probe),
            "Opening video for frame extraction"
        );

        let mut command = tokio::process::Command::new("ffmpeg");
        // -noautorotate keeps output dimensions equal to the probed ones.
        command
            .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24"]);
        if let Some(limit) = max_frames {
            command.args(["-frames:v", &limit.to_string()]);
        }
        command
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(FfmpegError::NotFound)?;
        let stdout = child.stdout.take().ok_or_else(|| {
            FfmpegError::IoError(std::io::Error::other("ffmpeg stdout not captured"))
        })?;
        let stderr = child.stderr.take().map(|pipe| tokio::spawn(drain_stderr(pipe)));

        Ok(Self {
            child,
            stdout,
            stderr,
            width,
            height,
            next_index: 0,
            done: false,
        })
    }

    /// Reap the child and turn a non-zero exit into an error.
    async fn finish(&mut self) -> Result<(), FfmpegError> {
        self.done = true;
        let status: ExitStatus = self.child.wait().await?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        if status.success() {
            Ok(())
        } else {
            Err(FfmpegError::ExecutionFailed {
                exit_code: status.code(),
                stderr,
            })
        }
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameReader {
    async fn next_frame(&mut self) -> Result<Option<RgbFrame>, FfmpegError> {
        if self.done {
            return Ok(None);
        }

        let frame_len = RgbFrame::byte_len(self.width, self.height);
        let mut buf = vec![0u8; frame_len];
        let filled = read_full(&mut self.stdout, &mut buf).await?;

        if filled < frame_len {
            if filled > 0 {
                tracing::warn!(
                    frame_index = self.next_index,
                    bytes = filled,
                    expected = frame_len,
                    "Discarding truncated trailing frame"
                );
            }
            self.finish().await?;
            return Ok(None);
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(RgbFrame::new(index, self.width, self.height, buf))
    }
}

/// Opens uploaded videos with [`FfmpegFrameReader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

#[async_trait]
impl SourceOpener for FfmpegOpener {
    async fn open(
        &self,
        path: &Path,
        max_frames: Option<u64>,
    ) -> Result<Box<dyn FrameSource>, FfmpegError> {
        let reader = FfmpegFrameReader::open(path, max_frames).await?;
        Ok(Box::new(reader))
    }
}

/// Read until `buf` is full or the stream ends. Returns the bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Collect (a bounded prefix of) the child's stderr.
async fn drain_stderr<R: AsyncRead + Unpin>(mut pipe: R) -> String {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = MAX_STDERR_BYTES.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    String::from_utf8_lossy(&kept).trim().to_string()
}
