//! amber-core: streaming parse-event materialization
//!
//! Sits between a zero-copy, callback-driven incremental parser and any
//! consumer that needs durable structured data. The parser reports only
//! ephemeral byte ranges into the buffer of the current `parse` call; this
//! crate resolves them, copies what must survive, assembles per-message
//! records and emits a deterministic trace through `amber-trace`.
//!
//! ## Pipeline
//! - [`span`] - bounds-checked resolution of `(start, length)` ranges
//! - [`capture`] - durable field copies that outlive the buffer
//! - [`context`] - per-message state, reset between pipelined messages
//! - [`batch`] - deferred offset batches, drained exactly once
//! - [`assemble`] - the Idle/InMessage/Error state machine and composite
//!   records
//! - [`session`] - the drive loop owning parser, assembler and sink
//!
//! The parser itself is a collaborator behind the traits in [`parser`];
//! [`testing`] ships a scripted double for it.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod assemble;
pub mod batch;
pub mod capture;
pub mod context;
pub mod error;
pub mod event;
pub mod parser;
pub mod session;
pub mod span;
pub mod testing;

// Re-exports
pub use assemble::{body_mode, Assembler, Phase};
pub use capture::{capture, OwnedField};
pub use context::{ChunkMeta, MessageContext};
pub use error::{Error, Result};
pub use event::{EventKind, OffsetEvent, RawOffset};
pub use parser::{EventSink, MessageKind, OffsetBatch, Parser, ParserHandle, BATCH_INLINE};
pub use session::{Session, SessionConfig, DEFAULT_MAX_FIELD};
pub use span::Span;
