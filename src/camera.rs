//! Camera-style facade over a [`FrameStreamSource`].
//!
//! Only the streaming path is real. The rest of the camera surface (image listing, projector,
//! point clouds, generic commands) answers with [`LoopcamError::Unimplemented`].

use crate::config::{DEFAULT_CAMERA_NAME, StreamConfig};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{LoopcamError, LoopcamResult};
use crate::stream::payload::EncodedPayload;
use crate::stream::source::FrameStreamSource;

/// Capabilities a camera advertises to callers before they pull.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct CameraProperties {
    /// MIME types a pull hint may name. Exactly the formats the stream can produce.
    pub mime_types: Vec<&'static str>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Stream frame rate.
    pub fps: Fps,
    /// Frames in the loop.
    pub frame_count: usize,
}

/// Camera that loops a pre-recorded clip or a still image.
#[derive(Debug)]
pub struct StaticCamera {
    name: String,
    stream: FrameStreamSource,
}

impl StaticCamera {
    /// Wrap an existing stream under the default resource name.
    pub fn new(stream: FrameStreamSource) -> Self {
        Self::with_name(DEFAULT_CAMERA_NAME, stream)
    }

    /// Wrap an existing stream under `name`.
    pub fn with_name(name: impl Into<String>, stream: FrameStreamSource) -> Self {
        Self {
            name: name.into(),
            stream,
        }
    }

    /// Build the camera and its stream from configuration.
    #[cfg(feature = "openh264")]
    pub fn from_config(cfg: &StreamConfig) -> LoopcamResult<Self> {
        let stream = FrameStreamSource::open(cfg)?;
        Ok(Self::with_name(cfg.name.clone(), stream))
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the underlying stream.
    pub fn stream(&self) -> &FrameStreamSource {
        &self.stream
    }

    /// Advertised capabilities.
    pub fn properties(&self) -> CameraProperties {
        let Canvas { width, height } = self.stream.canvas();
        CameraProperties {
            mime_types: self
                .stream
                .supported_formats()
                .iter()
                .map(|f| f.mime_type())
                .collect(),
            width,
            height,
            fps: self.stream.fps(),
            frame_count: self.stream.frame_count(),
        }
    }

    /// Next frame of the loop, encoded as `mime_hint` asks.
    pub fn next_frame(&self, mime_hint: &str) -> LoopcamResult<EncodedPayload> {
        self.stream.pull(mime_hint)
    }

    /// Accept a new configuration. The loop is fixed at construction, so this changes nothing.
    pub fn reconfigure(&self, _cfg: &StreamConfig) -> LoopcamResult<()> {
        tracing::debug!(camera = %self.name, "reconfigure ignored; source is fixed");
        Ok(())
    }

    /// Named multi-image capture. Not part of the streaming path.
    pub fn images(&self) -> LoopcamResult<Vec<EncodedPayload>> {
        Err(LoopcamError::Unimplemented { method: "images" })
    }

    /// Camera intrinsics projector. Not part of the streaming path.
    pub fn projector(&self) -> LoopcamResult<()> {
        Err(LoopcamError::Unimplemented {
            method: "projector",
        })
    }

    /// Point cloud capture. Not part of the streaming path.
    pub fn next_point_cloud(&self) -> LoopcamResult<Vec<u8>> {
        Err(LoopcamError::Unimplemented {
            method: "next_point_cloud",
        })
    }

    /// Free-form command channel. Not part of the streaming path.
    pub fn do_command(&self, _cmd: &serde_json::Value) -> LoopcamResult<serde_json::Value> {
        Err(LoopcamError::Unimplemented {
            method: "do_command",
        })
    }

    /// Release the encoder session. Later frame requests fail with [`LoopcamError::Closed`].
    pub fn close(&self) {
        self.stream.close();
    }
}

#[cfg(test)]
#[path = "../tests/unit/camera.rs"]
mod tests;
