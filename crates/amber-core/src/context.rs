//! Per-message durable state
//!
//! One `MessageContext` per in-flight message on a connection. Fields are a
//! fixed-shape struct rather than a string-keyed map: field identity is the
//! `EventKind`, resolved at compile time. The context never holds anything
//! computed against a stale buffer - only [`crate::capture::OwnedField`]
//! copies live here.

use crate::capture::OwnedField;
use smallvec::SmallVec;

/// Header or trailer pairs, stack-allocated for typical counts.
pub type PairList = SmallVec<[(OwnedField, OwnedField); 16]>;

/// Metadata for the chunk currently being assembled.
#[derive(Debug, Default)]
pub struct ChunkMeta {
    /// Raw (hex) chunk-length text as it appeared on the wire.
    pub length: Option<OwnedField>,
    /// Chunk extensions, in occurrence order.
    pub extensions: SmallVec<[(OwnedField, OwnedField); 4]>,
    pending_extension: Option<OwnedField>,
}

impl ChunkMeta {
    pub fn push_extension_name(&mut self, name: OwnedField) {
        self.pending_extension = Some(name);
    }

    pub fn push_extension_value(&mut self, value: OwnedField) {
        let name = self.pending_extension.take().unwrap_or_default();
        self.extensions.push((name, value));
    }

    /// Decoded chunk size, if the length text parsed as hex.
    pub fn size(&self) -> Option<u64> {
        let text = self.length.as_ref()?.to_text();
        u64::from_str_radix(text.trim(), 16).ok()
    }
}

/// Durable state for one in-flight message.
///
/// Lifecycle: reset at `message_start`, request-line fields dropped after
/// the composite headers record, fully released at `message_complete` so a
/// pipelined next message starts clean.
#[derive(Debug, Default)]
pub struct MessageContext {
    pub method: Option<OwnedField>,
    pub url: Option<OwnedField>,
    pub protocol: Option<OwnedField>,
    pub version: Option<OwnedField>,
    pub status: Option<OwnedField>,
    pub reason: Option<OwnedField>,
    pub headers: PairList,
    pub trailers: PairList,
    pub chunk: ChunkMeta,
    pending_header: Option<OwnedField>,
    pending_trailer: Option<OwnedField>,
}

impl MessageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if request-line fields were populated this message.
    pub fn is_request(&self) -> bool {
        self.method.is_some() || self.url.is_some()
    }

    pub fn push_header_name(&mut self, name: OwnedField) {
        self.pending_header = Some(name);
    }

    pub fn push_header_value(&mut self, value: OwnedField) {
        let name = self.pending_header.take().unwrap_or_default();
        self.headers.push((name, value));
    }

    pub fn push_trailer_name(&mut self, name: OwnedField) {
        self.pending_trailer = Some(name);
    }

    pub fn push_trailer_value(&mut self, value: OwnedField) {
        let name = self.pending_trailer.take().unwrap_or_default();
        self.trailers.push((name, value));
    }

    /// Take the current chunk metadata, leaving a clean slate for the next
    /// chunk of the same message.
    pub fn take_chunk(&mut self) -> ChunkMeta {
        std::mem::take(&mut self.chunk)
    }

    /// Drop request-line fields that must not outlive the composite headers
    /// record. Protocol and version stay for trailing diagnostics.
    pub fn clear_request_line(&mut self) {
        self.method = None;
        self.url = None;
    }

    /// Free every durable field. Idempotent.
    pub fn release(&mut self) {
        *self = Self::default();
    }
}
