//! loopcam serves a looping sequence of frames, one encoded frame per pull.
//!
//! Each pull carries a MIME-type hint that picks the codec path for that frame:
//!
//! - `video/h264`: the frame goes through one persistent H.264 encoder session, so consecutive
//!   video pulls form a valid elementary stream.
//! - `image/jpeg`: the frame is encoded as a standalone JPEG.
//!
//! Frames come from a clip or a still image decoded once at construction ([`FrameStore`]), and a
//! cyclic cursor walks them forever. [`FrameStreamSource`] is the single pull entry point;
//! [`StaticCamera`] wraps it with a camera-shaped surface.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Camera facade over a frame stream.
pub mod camera;
/// Stream configuration.
pub mod config;
/// Video and still-image codecs.
pub mod encode;
/// Per-request format negotiation.
pub mod negotiate;
/// Frame storage and cursor.
pub mod source;
/// Pull orchestration.
pub mod stream;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{LoopcamError, LoopcamResult};

pub use crate::camera::{CameraProperties, StaticCamera};
pub use crate::config::{H264Opts, StreamConfig};
#[cfg(feature = "openh264")]
pub use crate::encode::h264::OpenH264Encoder;
pub use crate::encode::still::{JpegCodec, StillImageCodec};
pub use crate::encode::video::{AccessUnit, VideoEncoder, VideoEncoderSession};
pub use crate::negotiate::{
    FormatNegotiator, MIME_TYPE_H264, MIME_TYPE_JPEG, Negotiated, OutputFormat,
};
pub use crate::source::cursor::CyclicIndex;
pub use crate::source::frame::Frame;
pub use crate::source::media::ffmpeg_tools_available;
pub use crate::source::store::{FrameStore, SourceDescriptor, SourceKind};
pub use crate::stream::payload::{EncodedPayload, StreamStats};
pub use crate::stream::source::{AdvancePolicy, FrameStreamSource, StreamOpts};
