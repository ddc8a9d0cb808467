//! The pull-driven orchestrator that ties cursor, store, negotiation and codecs together.

/// Payload and statistics types returned by pulls.
pub mod payload;
/// [`source::FrameStreamSource`] and its options.
pub mod source;
