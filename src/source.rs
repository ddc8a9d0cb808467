//! Frame sources: pre-decoded frame storage and the cyclic cursor over it.

/// Cyclic cursor over a fixed-length frame sequence.
pub mod cursor;
/// Immutable RGBA8 frame buffers.
pub mod frame;
pub(crate) mod media;
/// Pre-decoded frame sequences loaded from clips, stills or memory.
pub mod store;
