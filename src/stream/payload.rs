use crate::foundation::core::{Canvas, FrameIndex};
use crate::negotiate::OutputFormat;

/// Encoded frame handed to the caller of a pull.
///
/// The pipeline keeps no reference to the bytes once returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Which codec path produced `data`.
    pub format: OutputFormat,
    /// Encoded bytes: an H.264 access unit or a JPEG file.
    pub data: Vec<u8>,
    /// Dimensions of the source frame.
    pub canvas: Canvas,
    /// Position of the served frame in the source sequence.
    pub frame: FrameIndex,
    /// `true` when `data` decodes on its own. Always `true` for stills.
    pub keyframe: bool,
}

impl EncodedPayload {
    /// MIME type of `data`.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Snapshot of per-stream pull counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct StreamStats {
    /// Pulls that selected a frame (cancelled and closed pulls are not counted).
    pub pulls: u64,
    /// Successful video-codec payloads.
    pub video_payloads: u64,
    /// Successful still-image payloads.
    pub still_payloads: u64,
    /// Pulls rejected for an unsupported hint.
    pub unsupported: u64,
    /// Pulls that failed inside a codec.
    pub encode_failures: u64,
}
