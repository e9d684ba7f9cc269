//! Durable field capture
//!
//! Spans die with the buffer that produced them; an `OwnedField` is the copy
//! that survives. The copy happens synchronously, inside the callback, so no
//! span ever crosses a `parse` call boundary.

use crate::error::{Error, Result};
use crate::span::Span;
use bytes::Bytes;

/// A durable byte copy of a span, owned by the `MessageContext` that
/// captured it and freed when that context is released.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OwnedField {
    bytes: Bytes,
}

impl OwnedField {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lossy UTF-8 view for rendering.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Copy `span` out of the live buffer.
///
/// `limit` bounds a single copy; allocation failure surfaces as an error
/// instead of aborting, since a partial copy would corrupt the message
/// record.
pub fn capture(buf: &[u8], span: Span, limit: usize) -> Result<OwnedField> {
    let slice = span.resolve(buf)?;
    if slice.len() > limit {
        return Err(Error::FieldTooLarge {
            size: slice.len(),
            limit,
        });
    }

    let mut copy = Vec::new();
    copy.try_reserve_exact(slice.len())?;
    copy.extend_from_slice(slice);
    Ok(OwnedField {
        bytes: Bytes::from(copy),
    })
}
