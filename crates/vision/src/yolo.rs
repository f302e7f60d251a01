//! YOLO detector backed by ONNX Runtime.
//!
//! Expects an Ultralytics-style export: one `[1, 3, S, S]` float input and a
//! single `[1, 4 + classes, candidates]` output (or its transpose), where each
//! candidate is `cx, cy, w, h` in input pixels followed by per-class scores.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use armorsight_core::detection::{BoundingBox, Detection};
use armorsight_core::detector::{DetectError, Detector};
use armorsight_core::frame::RgbFrame;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};

use crate::error::VisionError;

/// Grey used by Ultralytics for letterbox padding.
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Output tensor name used by Ultralytics exports.
const DEFAULT_OUTPUT: &str = "output0";

/// Inference tuning for [`YoloDetector`].
#[derive(Debug, Clone)]
pub struct YoloParams {
    /// Square model input edge in pixels.
    pub input_size: u32,
    /// Candidates scoring below this are dropped before NMS.
    pub conf_threshold: f32,
    /// Same-class boxes overlapping more than this are suppressed.
    pub iou_threshold: f32,
    /// Upper bound on detections returned per frame.
    pub max_detections: usize,
    /// ONNX Runtime intra-op threads; `None` leaves the runtime default.
    pub intra_threads: Option<usize>,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.3,
            iou_threshold: 0.45,
            max_detections: 300,
            intra_threads: None,
        }
    }
}

/// How a source frame was fitted into the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub resized_w: u32,
    pub resized_h: u32,
}

impl Letterbox {
    /// Fit `width x height` into a `size x size` square, preserving aspect
    /// ratio and centring the image.
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let resized_w = ((width as f32 * scale).round() as u32).clamp(1, size);
        let resized_h = ((height as f32 * scale).round() as u32).clamp(1, size);
        Self {
            scale,
            pad_x: (size - resized_w) as f32 / 2.0,
            pad_y: (size - resized_h) as f32 / 2.0,
            resized_w,
            resized_h,
        }
    }
}

/// Model candidate before NMS, in source-frame pixels.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    class_id: usize,
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

/// Object detector running a YOLO ONNX model on the CPU.
///
/// The session sits behind a mutex, so concurrent callers take turns.
pub struct YoloDetector {
    session: Mutex<Session>,
    output_name: String,
    labels: Vec<String>,
    params: YoloParams,
    name: String,
}

impl YoloDetector {
    /// Load the model at `model_path`. Fails if the file is missing or the
    /// runtime rejects it.
    pub fn load(
        model_path: &Path,
        labels: Vec<String>,
        params: YoloParams,
    ) -> Result<Self, VisionError> {
        if !model_path.exists() {
            return Err(VisionError::Model(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        let mut builder = Session::builder()
            .map_err(|e| VisionError::Model(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::Model(format!("failed to set optimization level: {e}")))?;
        if let Some(threads) = params.intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| VisionError::Model(format!("failed to set thread count: {e}")))?;
        }
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Model(format!("failed to load ONNX model: {e}")))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

        let name = model_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "yolo".to_string());

        tracing::info!(
            model = %model_path.display(),
            input_size = params.input_size,
            conf_threshold = params.conf_threshold,
            labels = labels.len(),
            "YOLO detector initialized"
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            labels,
            params,
            name,
        })
    }

    fn label_for(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }

    fn run_inference(&self, input: Value) -> Result<(Vec<i64>, Vec<f32>), DetectError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::Inference("session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            DetectError::UnexpectedOutput(format!("missing output tensor {}", self.output_name))
        })?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::UnexpectedOutput(e.to_string()))?;

        Ok((shape.iter().copied().collect(), data.to_vec()))
    }
}

impl Detector for YoloDetector {
    fn detect(&self, frame: &RgbFrame) -> Result<Vec<Detection>, DetectError> {
        let (chw, letterbox) = preprocess(frame, self.params.input_size)?;
        let size = self.params.input_size as usize;
        let input = Tensor::from_array((vec![1usize, 3, size, size], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| DetectError::Inference(format!("failed to create tensor: {e}")))?;

        let (shape, data) = self.run_inference(input)?;
        let candidates = decode_output(
            &shape,
            &data,
            self.params.conf_threshold,
            &letterbox,
            frame.width,
            frame.height,
        )?;
        let kept = non_max_suppression(
            candidates,
            self.params.iou_threshold,
            self.params.max_detections,
        );

        let detections: Vec<Detection> = kept
            .into_iter()
            .filter_map(|c| {
                let bbox = BoundingBox::new(c.x1 as i32, c.y1 as i32, c.x2 as i32, c.y2 as i32)?;
                Detection::new(self.label_for(c.class_id), c.score.clamp(0.0, 1.0), bbox)
            })
            .collect();

        tracing::trace!(frame_index = frame.index, count = detections.len(), "Frame detected");
        Ok(detections)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Read class labels, one per line, in class-id order. Blank lines are kept
/// as empty slots so ids stay aligned; trailing blank lines are dropped.
pub fn load_labels(path: &Path) -> Result<Vec<String>, VisionError> {
    let text = std::fs::read_to_string(path)?;
    let mut labels: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
    while labels.last().is_some_and(|l| l.is_empty()) {
        labels.pop();
    }
    Ok(labels)
}

/// Default location for a label file next to the model (`best.onnx` -> `best.txt`).
pub fn sibling_labels_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("txt")
}

/// Letterbox `frame` into a normalized CHW float buffer.
fn preprocess(frame: &RgbFrame, size: u32) -> Result<(Vec<f32>, Letterbox), DetectError> {
    let src: ImageBuffer<Rgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.data.as_slice()).ok_or_else(
            || {
                DetectError::InvalidFrame(format!(
                    "{}x{} frame has {} bytes",
                    frame.width,
                    frame.height,
                    frame.data.len()
                ))
            },
        )?;

    let lb = Letterbox::fit(frame.width, frame.height, size);
    let resized = imageops::resize(&src, lb.resized_w, lb.resized_h, FilterType::Triangle);

    let plane = size as usize * size as usize;
    let mut chw = vec![PAD_VALUE; 3 * plane];
    let left = lb.pad_x.floor() as usize;
    let top = lb.pad_y.floor() as usize;

    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = (top + y as usize) * size as usize + left + x as usize;
        for c in 0..3 {
            chw[c * plane + offset] = pixel[c] as f32 / 255.0;
        }
    }

    Ok((chw, lb))
}

/// Turn the raw output tensor into thresholded candidates in frame pixels.
fn decode_output(
    shape: &[i64],
    data: &[f32],
    conf_threshold: f32,
    lb: &Letterbox,
    frame_w: u32,
    frame_h: u32,
) -> Result<Vec<Candidate>, DetectError> {
    let dims: Vec<usize> = match shape {
        [1, a, b] | [a, b] if *a > 0 && *b > 0 => vec![*a as usize, *b as usize],
        _ => {
            return Err(DetectError::UnexpectedOutput(format!(
                "unsupported output shape {shape:?}"
            )))
        }
    };
    let (rows, cols) = (dims[0], dims[1]);
    if data.len() != rows * cols {
        return Err(DetectError::UnexpectedOutput(format!(
            "output has {} values for shape {shape:?}",
            data.len()
        )));
    }

    // Features run along the shorter axis: [4+nc, N] normally, [N, 4+nc] when transposed.
    let channels_first = rows <= cols;
    let (features, count) = if channels_first { (rows, cols) } else { (cols, rows) };
    if features < 5 {
        return Err(DetectError::UnexpectedOutput(format!(
            "output has {features} features per candidate"
        )));
    }
    let at = |candidate: usize, feature: usize| -> f32 {
        if channels_first {
            data[feature * count + candidate]
        } else {
            data[candidate * features + feature]
        }
    };

    let max_x = frame_w as f32;
    let max_y = frame_h as f32;
    let mut candidates = Vec::new();

    for i in 0..count {
        let (class_id, score) = (4..features)
            .map(|f| (f - 4, at(i, f)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !score.is_finite() || score < conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        let unmap_x = |v: f32| ((v - lb.pad_x) / lb.scale).clamp(0.0, max_x);
        let unmap_y = |v: f32| ((v - lb.pad_y) / lb.scale).clamp(0.0, max_y);

        let candidate = Candidate {
            class_id,
            score,
            x1: unmap_x(cx - w / 2.0),
            y1: unmap_y(cy - h / 2.0),
            x2: unmap_x(cx + w / 2.0),
            y2: unmap_y(cy + h / 2.0),
        };
        if candidate.x2 - candidate.x1 >= 1.0 && candidate.y2 - candidate.y1 >= 1.0 {
            candidates.push(candidate);
        }
    }

    Ok(candidates)
}

/// Greedy per-class NMS. Output is sorted by descending score.
fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep.len() >= max_detections {
            break;
        }
        let overlaps = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold);
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = inter_w * inter_h;
    let union = (a.x2 - a.x1) * (a.y2 - a.y1) + (b.x2 - b.x1) * (b.y2 - b.y1) - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
