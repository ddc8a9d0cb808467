use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LoopcamError, LoopcamResult};
use crate::source::frame::Frame;

/// Default JPEG quality, matching common library defaults.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Stateless frame-to-image encoder.
///
/// No state crosses calls, so implementations may run concurrently and retries are always safe.
pub trait StillImageCodec: Send + Sync {
    /// Codec name used in errors and logs.
    fn codec(&self) -> &'static str;

    /// Encode one frame into a standalone image payload.
    fn encode(&self, idx: FrameIndex, frame: &Frame) -> LoopcamResult<Vec<u8>>;
}

/// Baseline JPEG encoder. Alpha is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JpegCodec {
    quality: u8,
}

impl JpegCodec {
    /// Create a codec with `quality` in `1..=100`.
    pub fn new(quality: u8) -> LoopcamResult<Self> {
        if !(1..=100).contains(&quality) {
            return Err(LoopcamError::validation(format!(
                "jpeg quality must be within 1..=100, got {quality}"
            )));
        }
        Ok(Self { quality })
    }

    /// Configured quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl StillImageCodec for JpegCodec {
    fn codec(&self) -> &'static str {
        "jpeg"
    }

    fn encode(&self, idx: FrameIndex, frame: &Frame) -> LoopcamResult<Vec<u8>> {
        let rgb = frame.to_rgb8();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode(&rgb, frame.width(), frame.height(), ExtendedColorType::Rgb8)
            .map_err(|e| LoopcamError::encode_failed(self.codec(), idx, e))?;
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/still.rs"]
mod tests;
