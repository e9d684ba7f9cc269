//! Error types for amber-core
//!
//! Two families live here. Protocol errors come from the parser and are
//! terminal for the session. Everything else is an internal-contract fault:
//! it indicates a bug or version mismatch between parser and consumer, never
//! a recoverable user condition.

use std::collections::TryReserveError;
use thiserror::Error;

/// Result type alias for amber operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the materialization layer
#[derive(Debug, Error)]
pub enum Error {
    /// A span resolved outside the live parse buffer
    #[error("span out of bounds: {start}+{len} exceeds buffer of {buffer} bytes")]
    SpanOutOfBounds {
        start: usize,
        len: usize,
        buffer: usize,
    },

    /// An offset-batch entry carried a kind this consumer does not know
    #[error("unknown offset kind {0}")]
    UnknownOffsetKind(u8),

    /// An event arrived in a phase that cannot accept it
    #[error("unexpected {event} event in {phase} phase")]
    UnexpectedEvent {
        event: &'static str,
        phase: &'static str,
    },

    /// A captured field exceeded the configured limit
    #[error("field too large: {size} bytes exceeds limit of {limit} bytes")]
    FieldTooLarge { size: usize, limit: usize },

    /// Allocation for a durable field copy failed
    #[error("field capture failed: {0}")]
    Capture(#[from] TryReserveError),

    /// The parser reported a protocol error
    #[error("protocol error {code} ({name}): {description}")]
    Protocol {
        code: u8,
        name: String,
        description: String,
    },

    /// The session already hit a terminal error
    #[error("session terminated by a previous error")]
    SessionTerminated,
}
