use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{LoopcamError, LoopcamResult};
use crate::source::frame::Frame;

/// One compressed access unit produced from one input frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessUnit {
    /// Encoded bytes (Annex-B for H.264).
    pub data: Vec<u8>,
    /// Whether the unit decodes without reference to earlier units.
    pub keyframe: bool,
}

/// Backend of a motion-compensated encoder.
///
/// Implementations keep reference frames between calls, so `encode` must be called in playback
/// order and never concurrently. [`VideoEncoderSession`] enforces both.
pub trait VideoEncoder: Send {
    /// Codec name used in errors and logs.
    fn codec(&self) -> &'static str;

    /// Encode the next frame in playback order into exactly one access unit.
    fn encode(&mut self, frame: &Frame) -> anyhow::Result<AccessUnit>;

    /// Make the next encoded unit a key frame.
    fn force_keyframe(&mut self);
}

/// Encoder session bound to fixed dimensions and frame rate for a stream's lifetime.
///
/// The session is never reset: consumers that joined mid-stream depend on the reference chain
/// built by earlier calls.
pub struct VideoEncoderSession {
    canvas: Canvas,
    fps: Fps,
    encoder: Box<dyn VideoEncoder>,
    frames_encoded: u64,
    failures: u64,
    resync_pending: bool,
}

impl VideoEncoderSession {
    /// Bind `encoder` to `canvas` at `fps`.
    pub fn new(canvas: Canvas, fps: Fps, encoder: Box<dyn VideoEncoder>) -> Self {
        Self {
            canvas,
            fps,
            encoder,
            frames_encoded: 0,
            failures: 0,
            resync_pending: false,
        }
    }

    /// Encode `frame` (served at position `idx`) as the next access unit.
    ///
    /// A frame of the wrong size is a setup bug and yields [`LoopcamError::DimensionMismatch`]
    /// without touching the encoder. After an encode failure the next call forces a key frame so
    /// the gap left by the skipped frame does not corrupt later delta frames.
    pub fn encode(&mut self, idx: FrameIndex, frame: &Frame) -> LoopcamResult<AccessUnit> {
        if frame.canvas() != self.canvas {
            return Err(LoopcamError::DimensionMismatch {
                expected: self.canvas,
                got: frame.canvas(),
            });
        }

        if self.resync_pending {
            tracing::debug!(frame = %idx, "forcing key frame after failed encode");
            self.encoder.force_keyframe();
        }

        match self.encoder.encode(frame) {
            Ok(unit) => {
                self.frames_encoded += 1;
                self.resync_pending = false;
                Ok(unit)
            }
            Err(e) => {
                self.failures += 1;
                self.resync_pending = true;
                tracing::warn!(
                    frame = %idx,
                    codec = self.encoder.codec(),
                    error = %e,
                    "video encode failed"
                );
                Err(LoopcamError::encode_failed(self.encoder.codec(), idx, e))
            }
        }
    }

    /// Dimensions every frame must match.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Frame rate the session was configured with.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Successful encode calls so far.
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    /// Failed encode calls so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Codec name of the backend.
    pub fn codec(&self) -> &'static str {
        self.encoder.codec()
    }
}

impl std::fmt::Debug for VideoEncoderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoEncoderSession")
            .field("codec", &self.encoder.codec())
            .field("canvas", &self.canvas)
            .field("fps", &self.fps)
            .field("frames_encoded", &self.frames_encoded)
            .field("failures", &self.failures)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/video.rs"]
mod tests;
