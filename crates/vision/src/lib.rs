//! Video-to-summary detection pipeline.
//!
//! - [`ffmpeg`] -- ffprobe metadata and the ffmpeg raw-frame reader.
//! - [`source`] -- the [`source::FrameSource`] abstraction the pipeline consumes.
//! - [`yolo`] -- ONNX Runtime YOLO detector implementing the core `Detector` trait.
//! - [`annotate`] -- optional diagnostic frame dumps with drawn boxes.
//! - [`pipeline`] -- frames -> detections -> records -> summary.

pub mod annotate;
pub mod error;
pub mod ffmpeg;
pub mod pipeline;
pub mod source;
pub mod yolo;

pub use error::VisionError;
pub use pipeline::{DetectionPipeline, PipelineOptions, PipelineOutcome};
