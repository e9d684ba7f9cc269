//! Trace sink drivers
//!
//! The sink is the seam between event materialization and whatever consumes
//! the trace: a line printer, an in-memory collector, or nothing at all.
//! Emission is best-effort by contract: a sink failure must never feed back
//! into the parse session, so failures are logged and swallowed here.

use crate::record::Record;
use crate::render::render;
use std::io;

/// Receives one immutable record per observed event.
pub trait TraceSink {
    /// Deliver one record. Implementations must not retain references into
    /// the record beyond this call.
    fn emit(&mut self, record: &Record);
}

/// Renders each record as one JSON line to an `io::Write`.
pub struct WriterSink<W: io::Write> {
    writer: W,
}

impl<W: io::Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the sink and hand back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> TraceSink for WriterSink<W> {
    fn emit(&mut self, record: &Record) {
        match render(record) {
            Ok(line) => {
                if let Err(err) = writeln!(self.writer, "{}", line) {
                    tracing::warn!(error = %err, event = record.event(), "trace write failed");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, event = record.event(), "trace render failed");
            }
        }
    }
}

/// Collects records and their rendered lines in memory.
///
/// This is the structured-collector driver: embedders and tests can inspect
/// either the typed records or the exact serialized trace.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<Record>,
    lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Event names in emission order.
    pub fn events(&self) -> Vec<&'static str> {
        self.records.iter().map(|record| record.event()).collect()
    }

    /// First record with the given event name, if any.
    pub fn find(&self, event: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.event() == event)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.lines.clear();
    }
}

impl TraceSink for MemorySink {
    fn emit(&mut self, record: &Record) {
        match render(record) {
            Ok(line) => self.lines.push(line),
            Err(err) => {
                tracing::warn!(error = %err, event = record.event(), "trace render failed");
            }
        }
        self.records.push(record.clone());
    }
}

/// Discards every record (benchmark no-op driver).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn emit(&mut self, _record: &Record) {}
}
