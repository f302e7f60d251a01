//! The detection-model capability.
//!
//! A [`Detector`] is constructed once per process (model loading is
//! expensive) and shared by every request as an `Arc<dyn Detector>`.
//! Implementations must not keep per-request state; any interior mutability
//! needed by the underlying runtime must be synchronized inside the
//! implementation so that concurrent `detect` calls are safe.

use crate::detection::Detection;
use crate::frame::RgbFrame;

/// Error type for detector implementations.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The frame cannot be fed to the model (wrong layout, zero size, ...).
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The model produced output the adapter cannot interpret.
    #[error("unexpected model output: {0}")]
    UnexpectedOutput(String),

    /// The inference runtime failed.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Runs an object-detection model over a single frame.
pub trait Detector: Send + Sync {
    /// Return zero or more detections for `frame`, already filtered by the
    /// implementation's confidence threshold.
    fn detect(&self, frame: &RgbFrame) -> Result<Vec<Detection>, DetectError>;

    /// Short human-readable model identifier for logs and health output.
    fn name(&self) -> &str;
}
