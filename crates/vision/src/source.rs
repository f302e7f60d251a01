//! Frame sources consumed by the detection pipeline.

use std::path::Path;

use armorsight_core::frame::RgbFrame;
use async_trait::async_trait;

use crate::ffmpeg::FfmpegError;

/// A forward-only, finite sequence of decoded frames in capture order.
///
/// Not restartable: once `next_frame` has returned `Ok(None)` or an error the
/// source is exhausted and must be reopened.
#[async_trait]
pub trait FrameSource: Send {
    /// Next decoded frame, `Ok(None)` at end of stream.
    async fn next_frame(&mut self) -> Result<Option<RgbFrame>, FfmpegError>;
}

#[async_trait]
impl FrameSource for Box<dyn FrameSource> {
    async fn next_frame(&mut self) -> Result<Option<RgbFrame>, FfmpegError> {
        (**self).next_frame().await
    }
}

/// Turns a video file on disk into a [`FrameSource`].
///
/// The pipeline holds one opener for its lifetime. Production uses
/// [`crate::ffmpeg::FfmpegOpener`].
#[async_trait]
pub trait SourceOpener: Send + Sync {
    async fn open(
        &self,
        path: &Path,
        max_frames: Option<u64>,
    ) -> Result<Box<dyn FrameSource>, FfmpegError>;
}
