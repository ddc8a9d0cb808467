use std::path::PathBuf;

use crate::foundation::core::{Canvas, FrameIndex};

/// Convenience result type used across loopcam.
pub type LoopcamResult<T> = Result<T, LoopcamError>;

/// Top-level error taxonomy for loading, negotiating and encoding frames.
#[derive(thiserror::Error, Debug)]
pub enum LoopcamError {
    /// The frame source could not be opened or decoded. Fatal to stream construction.
    #[error("source unreadable '{}': {reason}", path.display())]
    SourceUnreadable {
        /// Path of the offending source.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// A frame does not match the dimensions the encoder session was built for.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimensions fixed at construction.
        expected: Canvas,
        /// Dimensions actually observed.
        got: Canvas,
    },

    /// The per-pull format hint matched no supported output format.
    #[error("unsupported format hint '{hint}'")]
    UnsupportedFormat {
        /// Hint as supplied by the caller.
        hint: String,
    },

    /// A codec rejected a frame. The stream stays usable.
    #[error("{codec} encode failed for frame {frame}: {reason}")]
    EncodeFailed {
        /// Codec that failed (`h264`, `jpeg`, ...).
        codec: &'static str,
        /// Frame that was being encoded.
        frame: FrameIndex,
        /// Underlying codec error.
        reason: String,
    },

    /// Invalid user-provided configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// The pull was cancelled before it started.
    #[error("pull cancelled before frame selection")]
    Cancelled,

    /// The stream has been closed; its encoder session is gone.
    #[error("stream is closed")]
    Closed,

    /// Camera method that is not part of the streaming path.
    #[error("{method} is not implemented by this camera")]
    Unimplemented {
        /// Name of the camera method.
        method: &'static str,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LoopcamError {
    /// Build a [`LoopcamError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LoopcamError::SourceUnreadable`] value.
    pub fn source_unreadable(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`LoopcamError::EncodeFailed`] value.
    pub fn encode_failed(
        codec: &'static str,
        frame: FrameIndex,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::EncodeFailed {
            codec,
            frame,
            reason: reason.to_string(),
        }
    }

    /// Return `true` for errors that leave no usable stream behind.
    ///
    /// Per-pull failures (unsupported hint, encode failure, cancellation) are recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceUnreadable { .. } | Self::DimensionMismatch { .. }
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
