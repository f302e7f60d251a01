use armorsight_core::detector::DetectError;

use crate::ffmpeg::FfmpegError;

/// Failures while turning a video into a detection summary.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error("detection failed on frame {frame_index}: {source}")]
    Detect {
        frame_index: u64,
        #[source]
        source: DetectError,
    },

    #[error("model error: {0}")]
    Model(String),

    #[error("detection timed out after {0}s")]
    Timeout(u64),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VisionError {
    /// Whether the failure is attributable to the uploaded file.
    pub fn is_input_error(&self) -> bool {
        matches!(self, VisionError::Ffmpeg(e) if e.is_input_error())
    }
}
