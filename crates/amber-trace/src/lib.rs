//! amber-trace: canonical trace records for parse-event streams
//!
//! One `Record` is produced per observed parser event, rendered immediately
//! as a single JSON line and handed to a pluggable [`TraceSink`] driver.
//! Records are never buffered across parse calls and never mutated after
//! creation.
//!
//! ## Field order
//! Rendering is deterministic: `pos`, `event`, the event-specific fields in
//! the order they were attached, then `data` last. A record whose triggering
//! span was empty renders `"data": null`, which is distinct from an empty
//! string.
//!
//! ## Drivers
//! - [`WriterSink`] - line-oriented trace printer over any `io::Write`
//! - [`MemorySink`] - structured collector, keeps records and rendered lines
//! - [`NullSink`] - discards everything (benchmark no-op)

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod record;
pub mod render;
pub mod sink;

pub use record::{Record, Value};
pub use render::render;
pub use sink::{MemorySink, NullSink, TraceSink, WriterSink};
