//! Event kinds and offset-batch entries

use crate::span::Span;

/// Everything the parser can report about a message, whether delivered as a
/// direct callback or as a deferred offset-batch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    MessageStart = 0,
    MessageComplete = 1,
    Method = 2,
    Url = 3,
    Protocol = 4,
    Version = 5,
    Status = 6,
    Reason = 7,
    HeaderName = 8,
    HeaderValue = 9,
    HeadersComplete = 10,
    ChunkLength = 11,
    ChunkExtensionName = 12,
    ChunkExtensionValue = 13,
    Chunk = 14,
    Data = 15,
    Body = 16,
    TrailerName = 17,
    TrailerValue = 18,
    Trailers = 19,
}

impl EventKind {
    /// Decode a wire kind. `None` means a parser/consumer version mismatch.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(EventKind::MessageStart),
            1 => Some(EventKind::MessageComplete),
            2 => Some(EventKind::Method),
            3 => Some(EventKind::Url),
            4 => Some(EventKind::Protocol),
            5 => Some(EventKind::Version),
            6 => Some(EventKind::Status),
            7 => Some(EventKind::Reason),
            8 => Some(EventKind::HeaderName),
            9 => Some(EventKind::HeaderValue),
            10 => Some(EventKind::HeadersComplete),
            11 => Some(EventKind::ChunkLength),
            12 => Some(EventKind::ChunkExtensionName),
            13 => Some(EventKind::ChunkExtensionValue),
            14 => Some(EventKind::Chunk),
            15 => Some(EventKind::Data),
            16 => Some(EventKind::Body),
            17 => Some(EventKind::TrailerName),
            18 => Some(EventKind::TrailerValue),
            19 => Some(EventKind::Trailers),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Event name as it appears in the trace.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::MessageStart => "message_start",
            EventKind::MessageComplete => "message_complete",
            EventKind::Method => "method",
            EventKind::Url => "url",
            EventKind::Protocol => "protocol",
            EventKind::Version => "version",
            EventKind::Status => "status",
            EventKind::Reason => "reason",
            EventKind::HeaderName => "header_name",
            EventKind::HeaderValue => "header_value",
            EventKind::HeadersComplete => "headers_complete",
            EventKind::ChunkLength => "chunk_length",
            EventKind::ChunkExtensionName => "chunk_extension_name",
            EventKind::ChunkExtensionValue => "chunk_extension_value",
            EventKind::Chunk => "chunk",
            EventKind::Data => "data",
            EventKind::Body => "body",
            EventKind::TrailerName => "trailer_name",
            EventKind::TrailerValue => "trailer_value",
            EventKind::Trailers => "trailers",
        }
    }

    /// Aggregate kinds carry a deferred offset batch that must be drained
    /// (and cleared) before the event's own record is emitted.
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            EventKind::HeadersComplete
                | EventKind::Chunk
                | EventKind::Data
                | EventKind::Trailers
                | EventKind::MessageComplete
        )
    }
}

/// One wire entry of an offset batch: kind not yet validated, positions
/// relative to the current parse buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawOffset {
    pub kind: u8,
    pub start: usize,
    pub len: usize,
}

/// A validated offset-batch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetEvent {
    pub kind: EventKind,
    pub span: Span,
}
