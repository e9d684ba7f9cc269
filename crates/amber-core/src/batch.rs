//! Offset-batch draining
//!
//! Certain aggregate callbacks arrive with a deferred batch of
//! `(kind, start, length)` entries accumulated since the last drain. The
//! batch is copied out and cleared in one step before any entry is
//! dispatched, so a faulting entry can never be replayed on a later call.

use crate::error::{Error, Result};
use crate::event::{EventKind, OffsetEvent, RawOffset};
use crate::parser::{OffsetBatch, ParserHandle};
use crate::span::Span;

/// Drain and clear the pending batch in one step.
///
/// Entries come back in occurrence order; the caller dispatches each exactly
/// once.
pub fn take(parser: &mut dyn ParserHandle) -> OffsetBatch {
    let batch = parser.drain_offsets();
    parser.clear_offsets();
    batch
}

/// Validate one wire entry. An unrecognized kind is a fatal fault: it means
/// the parser and this consumer disagree on the offset vocabulary.
pub fn decode(raw: &RawOffset) -> Result<OffsetEvent> {
    let kind = EventKind::from_raw(raw.kind).ok_or(Error::UnknownOffsetKind(raw.kind))?;
    Ok(OffsetEvent {
        kind,
        span: Span::new(raw.start, raw.len),
    })
}
