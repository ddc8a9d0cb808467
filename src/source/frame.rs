use crate::foundation::core::Canvas;
use crate::foundation::error::{LoopcamError, LoopcamResult};

/// One decoded raster frame.
///
/// Pixels are straight-alpha RGBA8, tightly packed, row-major. A frame is immutable once built;
/// stores hand frames out behind `Arc` so pulls never copy pixel data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    canvas: Canvas,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap `data` as a `width x height` RGBA8 frame.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> LoopcamResult<Self> {
        let canvas = Canvas::new(width, height);
        if canvas.is_empty() {
            return Err(LoopcamError::validation("frame width/height must be non-zero"));
        }
        if data.len() != canvas.rgba8_len() {
            return Err(LoopcamError::validation(format!(
                "frame data size mismatch: got {} bytes, expected {} for {canvas}",
                data.len(),
                canvas.rgba8_len()
            )));
        }
        Ok(Self { canvas, data })
    }

    /// Build a frame filled with a single RGBA8 color.
    pub fn solid(canvas: Canvas, rgba: [u8; 4]) -> LoopcamResult<Self> {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(canvas.rgba8_len())
            .collect();
        Self::new(canvas.width, canvas.height, data)
    }

    /// Frame dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.canvas.height
    }

    /// Borrow the RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGBA8 value of the pixel at `(x, y)`, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.canvas.width || y >= self.canvas.height {
            return None;
        }
        let off = (y as usize * self.canvas.width as usize + x as usize) * 4;
        let px = &self.data[off..off + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copy out the pixels as packed RGB8, dropping alpha.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() / 4 * 3);
        for px in self.data.chunks_exact(4) {
            out.extend_from_slice(&px[..3]);
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/frame.rs"]
mod tests;
