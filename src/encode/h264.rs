use anyhow::Context as _;
use openh264::OpenH264API;
use openh264::encoder::{Encoder, EncoderConfig, FrameType};
use openh264::formats::{RgbaSliceU8, YUVBuffer};

use crate::config::H264Opts;
use crate::encode::video::{AccessUnit, VideoEncoder};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{LoopcamError, LoopcamResult};
use crate::source::frame::Frame;

/// Software H.264 encoder built from the bundled OpenH264 sources.
///
/// Emits one Annex-B access unit per frame. GOP structure and rate control are left to OpenH264.
pub struct OpenH264Encoder {
    inner: Encoder,
    canvas: Canvas,
}

impl OpenH264Encoder {
    /// Create an encoder for `canvas`-sized frames at `fps`.
    pub fn new(canvas: Canvas, fps: Fps, opts: &H264Opts) -> LoopcamResult<Self> {
        if canvas.is_empty() || !canvas.width.is_multiple_of(2) || !canvas.height.is_multiple_of(2)
        {
            return Err(LoopcamError::validation(format!(
                "h264 frame size must be non-zero and even (yuv420), got {canvas}"
            )));
        }

        let config = EncoderConfig::new()
            .set_bitrate_bps(opts.bitrate_bps)
            .max_frame_rate(fps.as_f64() as f32)
            .enable_skip_frame(false);
        let inner = Encoder::with_api_config(OpenH264API::from_source(), config)
            .context("initialize openh264 encoder")?;

        tracing::debug!(%canvas, fps = fps.as_f64(), bitrate = opts.bitrate_bps, "openh264 ready");
        Ok(Self { inner, canvas })
    }
}

impl VideoEncoder for OpenH264Encoder {
    fn codec(&self) -> &'static str {
        "h264"
    }

    fn encode(&mut self, frame: &Frame) -> anyhow::Result<AccessUnit> {
        anyhow::ensure!(
            frame.canvas() == self.canvas,
            "frame is {}, encoder expects {}",
            frame.canvas(),
            self.canvas
        );

        let rgba = RgbaSliceU8::new(
            frame.data(),
            (self.canvas.width as usize, self.canvas.height as usize),
        );
        let yuv = YUVBuffer::from_rgb_source(rgba);
        let bitstream = self.inner.encode(&yuv).context("openh264 encode")?;

        let keyframe = matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I);
        let data = bitstream.to_vec();
        anyhow::ensure!(!data.is_empty(), "openh264 produced no access unit");

        Ok(AccessUnit { data, keyframe })
    }

    fn force_keyframe(&mut self) {
        self.inner.force_intra_frame();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/h264.rs"]
mod tests;
