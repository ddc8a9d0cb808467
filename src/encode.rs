//! Codecs that turn frames into wire payloads.
//!
//! Two paths exist with different statefulness: the video path keeps one encoder session alive
//! for the whole stream and must see frames in playback order, the still path is a pure function
//! of one frame.

/// OpenH264-backed video encoder.
#[cfg(feature = "openh264")]
pub mod h264;
/// Stateless still-image codecs.
pub mod still;
/// Stateful video encoder session and backend trait.
pub mod video;
