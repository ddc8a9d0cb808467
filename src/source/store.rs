use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{LoopcamError, LoopcamResult};
use crate::source::frame::Frame;
use crate::source::media;

/// Kind of frame source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Multi-frame video clip, decoded through `ffmpeg`.
    Clip,
    /// Single still image, served as a one-frame loop.
    Still,
}

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceDescriptor {
    /// Path of the clip or image.
    pub path: PathBuf,
    /// Explicit source kind. `None` detects it from the file extension.
    #[serde(default)]
    pub kind: Option<SourceKind>,
    /// Upper bound on decoded clip frames. `None` decodes the whole clip.
    #[serde(default)]
    pub max_frames: Option<usize>,
}

impl SourceDescriptor {
    /// Describe `path`, detecting its kind from the extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: None,
            max_frames: None,
        }
    }

    /// Describe a clip source.
    pub fn clip(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: Some(SourceKind::Clip),
            ..Self::new(path)
        }
    }

    /// Describe a still-image source.
    pub fn still(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: Some(SourceKind::Still),
            ..Self::new(path)
        }
    }

    /// Explicit kind, or the kind implied by the file extension.
    ///
    /// Extensions the `image` crate recognizes are stills; anything else is a clip.
    pub fn resolved_kind(&self) -> SourceKind {
        self.kind.unwrap_or_else(|| {
            if image::ImageFormat::from_path(&self.path).is_ok() {
                SourceKind::Still
            } else {
                SourceKind::Clip
            }
        })
    }
}

/// Finite, pre-decoded frame sequence with stable indices.
///
/// Loading is eager: every frame is decoded and dimension-checked up front, so a broken source
/// fails construction instead of surfacing mid-stream.
#[derive(Clone, Debug)]
pub struct FrameStore {
    frames: Vec<Arc<Frame>>,
    canvas: Canvas,
}

impl FrameStore {
    /// Load and decode every frame described by `desc`.
    #[tracing::instrument(skip_all, fields(path = %desc.path.display()))]
    pub fn load(desc: &SourceDescriptor) -> LoopcamResult<Self> {
        let kind = desc.resolved_kind();
        let frames = match kind {
            SourceKind::Still => vec![load_still(&desc.path)?],
            SourceKind::Clip => load_clip(&desc.path, desc.max_frames)?,
        };
        let store = Self::from_frames(frames)
            .map_err(|e| LoopcamError::source_unreadable(&desc.path, e))?;
        tracing::info!(
            ?kind,
            frames = store.len(),
            canvas = %store.canvas(),
            "frame source loaded"
        );
        Ok(store)
    }

    /// Build a store from already-decoded frames.
    ///
    /// Fails when `frames` is empty or the frames disagree on dimensions.
    pub fn from_frames(frames: Vec<Frame>) -> LoopcamResult<Self> {
        let Some(first) = frames.first() else {
            return Err(LoopcamError::validation(
                "frame sequence must contain at least one frame",
            ));
        };
        let canvas = first.canvas();
        if let Some((idx, bad)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.canvas() != canvas)
        {
            return Err(LoopcamError::validation(format!(
                "frame {} is {}, expected {canvas} like frame #0",
                FrameIndex(idx),
                bad.canvas()
            )));
        }

        Ok(Self {
            frames: frames.into_iter().map(Arc::new).collect(),
            canvas,
        })
    }

    /// Number of frames in the sequence (always at least 1).
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always `false`: empty stores cannot be built.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Dimensions shared by every frame.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Frame at `idx`.
    pub fn get(&self, idx: FrameIndex) -> Option<&Arc<Frame>> {
        self.frames.get(idx.0)
    }
}

fn load_still(path: &Path) -> LoopcamResult<Frame> {
    let bytes = std::fs::read(path).map_err(|e| LoopcamError::source_unreadable(path, e))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| LoopcamError::source_unreadable(path, format!("decode image: {e}")))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Frame::new(width, height, rgba.into_raw()).map_err(|e| LoopcamError::source_unreadable(path, e))
}

fn load_clip(path: &Path, max_frames: Option<usize>) -> LoopcamResult<Vec<Frame>> {
    if !path.is_file() {
        return Err(LoopcamError::source_unreadable(path, "no such file"));
    }
    if max_frames == Some(0) {
        return Err(LoopcamError::source_unreadable(
            path,
            "max_frames must be at least 1",
        ));
    }
    let info = media::probe_clip(path)?;
    let raw = media::decode_clip_rgba8(path, info, max_frames)?;
    if raw.is_empty() {
        return Err(LoopcamError::source_unreadable(path, "clip decoded to zero frames"));
    }
    tracing::debug!(frames = raw.len(), canvas = %info.canvas, "decoded clip");

    raw.into_iter()
        .map(|data| {
            Frame::new(info.canvas.width, info.canvas.height, data)
                .map_err(|e| LoopcamError::source_unreadable(path, e))
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/source/store.rs"]
mod tests;
