//! Stream configuration, loadable from JSON.

use std::path::Path;

use anyhow::Context as _;

use crate::encode::still::DEFAULT_JPEG_QUALITY;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{LoopcamError, LoopcamResult};
use crate::source::store::SourceDescriptor;
use crate::stream::source::{AdvancePolicy, StreamOpts};

/// Resource name used when none is configured.
pub const DEFAULT_CAMERA_NAME: &str = "static";
/// Clip served when no source is configured.
pub const DEFAULT_SOURCE_PATH: &str = "testsrc.mp4";

/// Options for the H.264 video path.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct H264Opts {
    /// Target bitrate in bits per second.
    pub bitrate_bps: u32,
}

impl Default for H264Opts {
    fn default() -> Self {
        Self {
            bitrate_bps: 2_000_000,
        }
    }
}

/// Everything needed to build a [`crate::FrameStreamSource`] from files.
///
/// Missing JSON fields take their defaults: a 640x480 stream at 30 fps, JPEG quality 75,
/// forward-progress cursor policy.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Camera resource name.
    pub name: String,
    /// Frame source.
    pub source: SourceDescriptor,
    /// Frame width in pixels; must match the source.
    pub width: u32,
    /// Frame height in pixels; must match the source.
    pub height: u32,
    /// Encoder frame rate.
    pub fps: Fps,
    /// JPEG quality for still pulls (`1..=100`).
    pub jpeg_quality: u8,
    /// Video encoder options.
    pub h264: H264Opts,
    /// Cursor behavior on failed pulls.
    pub advance: AdvancePolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CAMERA_NAME.to_string(),
            source: SourceDescriptor::new(DEFAULT_SOURCE_PATH),
            width: 640,
            height: 480,
            fps: Fps::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            h264: H264Opts::default(),
            advance: AdvancePolicy::default(),
        }
    }
}

impl StreamConfig {
    /// Read a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> LoopcamResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read stream config '{}'", path.display()))?;
        Self::from_json(&text)
    }

    /// Parse a JSON config document.
    pub fn from_json(text: &str) -> LoopcamResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| LoopcamError::validation(format!("invalid stream config: {e}")))
    }

    /// Frame dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }

    /// Orchestrator options derived from this config.
    pub fn stream_opts(&self) -> StreamOpts {
        StreamOpts {
            canvas: self.canvas(),
            fps: self.fps,
            advance: self.advance,
        }
    }

    /// Reject configurations no stream could be built from.
    pub fn validate(&self) -> LoopcamResult<()> {
        if self.name.trim().is_empty() {
            return Err(LoopcamError::validation("camera name must be non-empty"));
        }
        if self.source.path.as_os_str().is_empty() {
            return Err(LoopcamError::validation("source path must be non-empty"));
        }
        if self.source.max_frames == Some(0) {
            return Err(LoopcamError::validation("source max_frames must be >= 1"));
        }
        let canvas = self.canvas();
        if canvas.is_empty() {
            return Err(LoopcamError::validation("width/height must be non-zero"));
        }
        if !canvas.width.is_multiple_of(2) || !canvas.height.is_multiple_of(2) {
            return Err(LoopcamError::validation(format!(
                "width/height must be even (required for yuv420 h264), got {canvas}"
            )));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(LoopcamError::validation(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.h264.bitrate_bps == 0 {
            return Err(LoopcamError::validation("h264 bitrate_bps must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
