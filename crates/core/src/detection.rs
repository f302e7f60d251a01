//! Detection value types shared by detectors, the pipeline, and the summarizer.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in integer pixel coordinates of the source frame.
///
/// Always satisfies `x1 < x2` and `y1 < y2`; use [`BoundingBox::new`] to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Returns `None` for empty or inverted boxes.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        if x1 < x2 && y1 < y2 {
            Some(Self { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// A single object found in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Model confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Returns `None` when `confidence` is outside `[0, 1]` or not finite.
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Option<Self> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return None;
        }
        Some(Self {
            label: label.into(),
            confidence,
            bbox,
        })
    }
}

/// A detection tagged with the index of the frame it came from.
///
/// Records for one video are accumulated in frame order and discarded once
/// the video has been summarized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub frame_index: u64,
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl DetectionRecord {
    pub fn from_detection(frame_index: u64, detection: Detection) -> Self {
        Self {
            frame_index,
            label: detection.label,
            confidence: detection.confidence,
            bbox: detection.bbox,
        }
    }
}
