//! Session drive loop
//!
//! A `Session` ties one parser to one assembler and one trace sink for the
//! life of a connection. Each `feed` call hands the parser a buffer, relays
//! every inline callback into the assembler, and reports either the consumed
//! byte count or the fault that ended the call. Nothing about the buffer is
//! retained once `feed` returns; every durable value was copied out during
//! the callbacks.

use crate::assemble::{Assembler, Phase};
use crate::error::{Error, Result};
use crate::event::EventKind;
use crate::parser::{EventSink, Parser, ParserHandle};
use crate::span::Span;
use amber_trace::{Record, TraceSink};

/// Default cap on a single captured field copy.
pub const DEFAULT_MAX_FIELD: usize = 64 * 1024;

/// Tuning knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Render before/after state-change diagnostics
    pub state_changes: bool,
    /// Largest single field copy accepted
    pub max_field: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_changes: true,
            max_field: DEFAULT_MAX_FIELD,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle state-transition diagnostics
    pub fn state_changes(mut self, enabled: bool) -> Self {
        self.state_changes = enabled;
        self
    }

    /// Set the per-field capture limit in bytes
    pub fn max_field(mut self, limit: usize) -> Self {
        self.max_field = limit;
        self
    }
}

/// One connection's worth of parser plus materialization state, spanning any
/// number of `feed` calls and pipelined messages.
pub struct Session<P: Parser, S: TraceSink> {
    parser: P,
    assembler: Assembler,
    sink: S,
    config: SessionConfig,
}

impl<P: Parser, S: TraceSink> Session<P, S> {
    pub fn new(parser: P, sink: S) -> Self {
        Self::with_config(parser, sink, SessionConfig::default())
    }

    pub fn with_config(parser: P, sink: S, config: SessionConfig) -> Self {
        let assembler = Assembler::new(config.max_field);
        Self {
            parser,
            assembler,
            sink,
            config,
        }
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the session and hand back the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Feed one buffer to the parser.
    ///
    /// Callbacks fire inline; the buffer is only borrowed for the duration
    /// of this call. Returns the number of bytes consumed, which may be less
    /// than `buf.len()` for partial input - the caller re-presents the rest
    /// on the next call. A protocol error or contract fault is terminal:
    /// every later call fails with [`Error::SessionTerminated`].
    pub fn feed(&mut self, buf: &[u8]) -> Result<usize> {
        if self.assembler.phase() == Phase::Error {
            return Err(Error::SessionTerminated);
        }

        let mut dispatch = Dispatch {
            assembler: &mut self.assembler,
            sink: &mut self.sink,
            config: &self.config,
            buf,
            fault: None,
        };
        let consumed = self.parser.parse(buf, &mut dispatch);

        match dispatch.fault.take() {
            Some(err) => Err(err),
            None => {
                tracing::trace!(consumed, state = self.parser.state_name(), "parse call done");
                Ok(consumed)
            }
        }
    }
}

/// Relays parser callbacks into the assembler for the duration of one
/// `parse` call. The first fault aborts processing of the rest of the call.
struct Dispatch<'a, S: TraceSink> {
    assembler: &'a mut Assembler,
    sink: &'a mut S,
    config: &'a SessionConfig,
    buf: &'a [u8],
    fault: Option<Error>,
}

impl<S: TraceSink> Dispatch<'_, S> {
    fn state_record(&mut self, parser: &mut dyn ParserHandle, event: &'static str, span: Span) {
        if self.fault.is_some() || !self.config.state_changes {
            return;
        }
        let record = Record::new(parser.position(), event)
            .field("current_state", parser.state_name())
            .payload(payload_of(self.buf, span));
        self.sink.emit(&record);
    }
}

impl<S: TraceSink> EventSink for Dispatch<'_, S> {
    fn on_event(&mut self, parser: &mut dyn ParserHandle, kind: EventKind, span: Span) {
        if self.fault.is_some() {
            return;
        }
        if let Err(err) = self
            .assembler
            .handle(parser, self.buf, kind, span, self.sink)
        {
            self.assembler.poison();
            self.fault = Some(err);
        }
    }

    fn before_state_change(&mut self, parser: &mut dyn ParserHandle, span: Span) {
        self.state_record(parser, "before_state_change", span);
    }

    fn after_state_change(&mut self, parser: &mut dyn ParserHandle, span: Span) {
        self.state_record(parser, "after_state_change", span);
    }

    fn on_finish(&mut self, parser: &mut dyn ParserHandle, span: Span) {
        if self.fault.is_some() {
            return;
        }
        let record = Record::new(parser.position(), "finish").payload(payload_of(self.buf, span));
        self.sink.emit(&record);
    }

    fn on_error(&mut self, parser: &mut dyn ParserHandle, span: Span) {
        if self.fault.is_some() {
            return;
        }
        let err = self.assembler.fail(parser, self.buf, span, self.sink);
        self.fault = Some(err);
    }
}

/// Best-effort payload for diagnostic notifications; these never fault.
fn payload_of(buf: &[u8], span: Span) -> Option<String> {
    let slice = span.resolve(buf).ok()?;
    if slice.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(slice).into_owned())
    }
}
