//! Per-request output format negotiation.

/// MIME type of the motion-video path (H.264 elementary stream).
pub const MIME_TYPE_H264: &str = "video/h264";
/// MIME type of the still-image path.
pub const MIME_TYPE_JPEG: &str = "image/jpeg";

/// Output representation of one pulled frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One access unit from the stream's persistent video encoder.
    VideoCodec,
    /// One standalone still image.
    StillImage,
}

impl OutputFormat {
    /// Every format the pipeline can produce, in negotiation priority order.
    pub const ALL: [OutputFormat; 2] = [OutputFormat::VideoCodec, OutputFormat::StillImage];

    /// MIME type advertised for this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::VideoCodec => MIME_TYPE_H264,
            OutputFormat::StillImage => MIME_TYPE_JPEG,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputFormat::VideoCodec => "video-codec",
            OutputFormat::StillImage => "still-image",
        })
    }
}

/// Result of classifying a format hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Negotiated {
    /// Route the frame through the stateful video encoder.
    Video,
    /// Route the frame through the still-image codec.
    Still,
    /// No supported format matched; the pull fails.
    Unsupported,
}

impl Negotiated {
    /// Output format for supported outcomes.
    pub fn format(self) -> Option<OutputFormat> {
        match self {
            Negotiated::Video => Some(OutputFormat::VideoCodec),
            Negotiated::Still => Some(OutputFormat::StillImage),
            Negotiated::Unsupported => None,
        }
    }
}

/// Classifies format hints against the closed vocabulary [`MIME_TYPE_H264`], [`MIME_TYPE_JPEG`].
///
/// Matching is an ASCII case-insensitive substring test, so decorated hints such as
/// `image/jpeg+lazy` or `video/h264; profile=baseline` still resolve. The video token is checked
/// first; a hint containing both tokens is video. There is no default format.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormatNegotiator;

impl FormatNegotiator {
    /// Create a negotiator.
    pub fn new() -> Self {
        Self
    }

    /// Classify one request hint.
    pub fn classify(&self, hint: &str) -> Negotiated {
        let hint = hint.to_ascii_lowercase();
        if hint.contains(MIME_TYPE_H264) {
            Negotiated::Video
        } else if hint.contains(MIME_TYPE_JPEG) {
            Negotiated::Still
        } else {
            Negotiated::Unsupported
        }
    }

    /// Formats this negotiator can resolve to, exactly.
    pub fn supported(&self) -> &'static [OutputFormat] {
        &OutputFormat::ALL
    }
}

#[cfg(test)]
#[path = "../tests/unit/negotiate.rs"]
mod tests;
