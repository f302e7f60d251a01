//! Diagnostic frame dumps.
//!
//! When enabled, every processed frame is written as a JPEG with its
//! detections outlined, under `<dir>/<run_id>/frame_<index>.jpg`. Dumps are
//! best-effort: a failed write is logged and never fails detection.

use std::path::{Path, PathBuf};

use armorsight_core::detection::{BoundingBox, Detection};
use armorsight_core::frame::RgbFrame;
use image::{ImageFormat, Rgb, RgbImage};

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: i32 = 2;

/// Writes annotated frames for one detection run.
#[derive(Debug, Clone)]
pub struct Annotator {
    dir: PathBuf,
}

impl Annotator {
    /// Prepare `<root>/<run_id>`, creating it if needed.
    pub fn create(root: &Path, run_id: &str) -> std::io::Result<Self> {
        let dir = root.join(run_id);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Draw `detections` onto a copy of `frame` and save it.
    pub fn write(&self, frame: &RgbFrame, detections: &[Detection]) {
        let path = self.dir.join(format!("frame_{}.jpg", frame.index));
        if let Err(e) = render(frame, detections).and_then(|img| {
            img.save_with_format(&path, ImageFormat::Jpeg)
                .map_err(|e| e.to_string())
        }) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write annotated frame");
        }
    }
}

/// Frame pixels with every detection box outlined.
pub fn render(frame: &RgbFrame, detections: &[Detection]) -> Result<RgbImage, String> {
    let mut img = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| format!("frame {} has an invalid buffer", frame.index))?;
    for detection in detections {
        draw_box(&mut img, &detection.bbox);
    }
    Ok(img)
}

fn draw_box(img: &mut RgbImage, bbox: &BoundingBox) {
    let (w, h) = (img.width() as i32, img.height() as i32);
    let mut put = |x: i32, y: i32| {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            img.put_pixel(x as u32, y as u32, BOX_COLOR);
        }
    };

    for t in 0..BOX_THICKNESS {
        for x in bbox.x1..=bbox.x2 {
            put(x, bbox.y1 + t);
            put(x, bbox.y2 - t);
        }
        for y in bbox.y1..=bbox.y2 {
            put(bbox.x1 + t, y);
            put(bbox.x2 - t, y);
        }
    }
}
