//! Decoded video frames as they travel from the frame extractor to a detector.

/// One decoded frame in packed RGB24 layout (`width * height * 3` bytes,
/// row-major, no padding).
#[derive(Debug, Clone)]
pub struct RgbFrame {
    /// Zero-based position of the frame in capture order.
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Number of bytes a packed RGB24 frame of the given size occupies.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Build a frame, checking that `data` matches the declared dimensions.
    pub fn new(index: u64, width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != Self::byte_len(width, height) {
            return None;
        }
        Some(Self {
            index,
            width,
            height,
            data,
        })
    }

    /// Read the RGB triple at `(x, y)`. Returns `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }
}
