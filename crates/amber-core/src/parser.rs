//! Collaborator contract for the incremental parser
//!
//! The parser itself is external to this crate: amber consumes it purely
//! through this contract. A call to [`Parser::parse`] runs to completion on
//! the calling thread, firing the [`EventSink`] inline and in strict stream
//! order before returning the consumed byte count.
//!
//! Non-reentrancy is enforced by the types: callbacks only ever receive a
//! [`ParserHandle`], which exposes snapshot accessors and the pending offset
//! batch but no way to call `parse` again.

use crate::event::{EventKind, RawOffset};
use crate::span::Span;
use smallvec::SmallVec;

/// Offset entries kept inline before a batch spills to the heap.
pub const BATCH_INLINE: usize = 16;

/// A drained offset batch, in occurrence order.
pub type OffsetBatch = SmallVec<[RawOffset; BATCH_INLINE]>;

/// What the parser currently believes the in-flight message is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    Unknown,
    Request,
    Response,
}

/// Read-only snapshot of the parser plus access to the pending offset batch.
///
/// Accessor values are only authoritative during a callback or immediately
/// after `parse` returns.
pub trait ParserHandle {
    /// Total bytes consumed across the life of the session.
    fn position(&self) -> u64;

    /// Symbolic name of the parser's current internal state.
    fn state_name(&self) -> &'static str;

    fn message_kind(&self) -> MessageKind;

    /// Numeric status code of the in-flight response (0 if none).
    fn status(&self) -> u64;

    /// Declared content length (0 if none).
    fn content_length(&self) -> u64;

    fn has_chunked_transfer_encoding(&self) -> bool;

    /// Numeric error code once the parser has failed (0 otherwise).
    fn error_code(&self) -> u8;

    fn error_code_name(&self) -> &'static str;

    fn error_description(&self) -> &str;

    /// Copy out the pending offset batch, in occurrence order. Does not
    /// clear it; pair with [`ParserHandle::clear_offsets`].
    fn drain_offsets(&mut self) -> OffsetBatch;

    /// Drop the pending offset batch.
    fn clear_offsets(&mut self);
}

/// The incremental parser.
pub trait Parser: ParserHandle {
    /// Feed one buffer. Zero or more sink callbacks fire inline before this
    /// returns; the return value is the number of bytes consumed. Spans
    /// handed to the sink are relative to `buf` and die with this call.
    fn parse(&mut self, buf: &[u8], sink: &mut dyn EventSink) -> usize;
}

/// Receives everything the parser reports while `parse` runs.
///
/// One polymorphic seam instead of a struct of per-event callback pointers;
/// drivers differ only in what they do with the events.
pub trait EventSink {
    /// A message event with its span in the current buffer.
    fn on_event(&mut self, parser: &mut dyn ParserHandle, kind: EventKind, span: Span);

    /// Diagnostic notification fired before an internal state transition.
    fn before_state_change(&mut self, parser: &mut dyn ParserHandle, span: Span) {
        let _ = (parser, span);
    }

    /// Diagnostic notification fired after an internal state transition.
    fn after_state_change(&mut self, parser: &mut dyn ParserHandle, span: Span) {
        let _ = (parser, span);
    }

    /// Parsing concluded for the current input.
    fn on_finish(&mut self, parser: &mut dyn ParserHandle, span: Span) {
        let _ = (parser, span);
    }

    /// The parser failed; its error accessors are now authoritative.
    fn on_error(&mut self, parser: &mut dyn ParserHandle, span: Span);
}
