use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LoopcamError, LoopcamResult};

/// Modular cursor over `[0, len)`.
///
/// The cursor owns no locking; the stream that holds it serializes access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CyclicIndex {
    len: usize,
    pos: usize,
}

impl CyclicIndex {
    /// Create a cursor positioned at 0. `len` must be at least 1.
    pub fn new(len: usize) -> LoopcamResult<Self> {
        if len == 0 {
            return Err(LoopcamError::validation(
                "cyclic index needs at least one position",
            ));
        }
        Ok(Self { len, pos: 0 })
    }

    /// Position that the next pull will serve.
    pub fn current(&self) -> FrameIndex {
        FrameIndex(self.pos)
    }

    /// Move to the next position, wrapping after `len - 1`.
    pub fn advance(&mut self) {
        self.pos = (self.pos + 1) % self.len;
    }

    /// Number of positions in the cycle.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: a cursor has at least one position.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/cursor.rs"]
mod tests;
