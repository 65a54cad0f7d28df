use std::ops::Range;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::opts::AccessMode;

/// A bounded view over one column's raw bytes inside the row buffer.
///
/// In [`AccessMode::Sequential`] the window keeps a release watermark: bytes below it were
/// consumed and may have been discarded, so they can no longer be sliced.
#[derive(Debug, Clone)]
pub struct ByteWindow {
    buf: Rc<[u8]>,
    range: Range<usize>,
    mode: AccessMode,
    released: usize,
}

impl ByteWindow {
    /// Returns `OutOfRange` if `range` does not lie inside `buf`
    pub fn new(buf: Rc<[u8]>, range: Range<usize>, mode: AccessMode) -> Result<Self> {
        if range.start > range.end || range.end > buf.len() {
            return Err(Error::OutOfRange(format!(
                "column bytes {}..{} outside row buffer of {} bytes",
                range.start,
                range.end,
                buf.len()
            )));
        }
        Ok(Self {
            buf,
            range,
            mode,
            released: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Offset below which bytes are no longer available
    pub fn released(&self) -> usize {
        self.released
    }

    pub fn slice(&self, start: usize, length: usize) -> Result<&[u8]> {
        let end = start
            .checked_add(length)
            .filter(|&end| end <= self.len())
            .ok_or_else(|| {
                Error::OutOfRange(format!(
                    "bytes {start}..{} of a {}-byte column",
                    start.saturating_add(length),
                    self.len()
                ))
            })?;
        if self.mode == AccessMode::Sequential && start < self.released {
            return Err(Error::seek_back(&format!(
                "byte {start} was already consumed (released up to {})",
                self.released
            )));
        }
        Ok(&self.buf[self.range.start + start..self.range.start + end])
    }

    /// Mark bytes below `upto` as consumed. No-op in buffered mode.
    pub fn release(&mut self, upto: usize) {
        if self.mode == AccessMode::Sequential {
            self.released = self.released.max(upto.min(self.len()));
        }
    }

    /// Same bytes, fresh watermark
    pub fn rewound(&self) -> Self {
        Self {
            buf: Rc::clone(&self.buf),
            range: self.range.clone(),
            mode: self.mode,
            released: 0,
        }
    }
}
