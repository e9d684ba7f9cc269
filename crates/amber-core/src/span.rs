//! Byte-range references into the live parse buffer
//!
//! A `Span` is only meaningful during the callback that produced it: it
//! points into the buffer of the current `parse` call and dangles the moment
//! that buffer is replaced. Anything that must outlive the call goes through
//! [`crate::capture`] instead.

use crate::error::{Error, Result};

/// A `(start, length)` byte range relative to the current parse buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    /// A zero-length span at position 0.
    pub const EMPTY: Span = Span { start: 0, len: 0 };

    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// True for "no data" spans, which render as `null` downstream.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resolve against the live buffer.
    ///
    /// A span outside the buffer is an internal-contract fault (a bug in
    /// batch draining or buffer hand-off), never a recoverable condition.
    pub fn resolve<'b>(&self, buf: &'b [u8]) -> Result<&'b [u8]> {
        let end = self
            .start
            .checked_add(self.len)
            .filter(|end| *end <= buf.len())
            .ok_or(Error::SpanOutOfBounds {
                start: self.start,
                len: self.len,
                buffer: buf.len(),
            })?;
        Ok(&buf[self.start..end])
    }
}
