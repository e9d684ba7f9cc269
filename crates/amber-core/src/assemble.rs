//! Message assembly
//!
//! The assembler mirrors (but never drives) the parser's own state machine.
//! Every event is folded into the per-message context and traced; the
//! aggregate events additionally drain the pending offset batch and
//! synthesize composite records: the headers summary, per-chunk metadata and
//! the collected trailers.

use crate::batch;
use crate::capture::{capture, OwnedField};
use crate::context::MessageContext;
use crate::error::{Error, Result};
use crate::event::EventKind;
use crate::parser::ParserHandle;
use crate::span::Span;
use amber_trace::{Record, TraceSink, Value};

/// Assembler phase, independent of the parser's internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Between messages, ready for `message_start`
    #[default]
    Idle,
    /// Accumulating fields for an in-flight message
    InMessage,
    /// Terminal: a protocol error or contract fault ended the session
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::InMessage => "in_message",
            Phase::Error => "error",
        }
    }
}

/// Body framing reported in the composite headers record.
///
/// Strict priority: chunked transfer-encoding wins over a declared content
/// length, which wins over "no body expected".
pub fn body_mode(parser: &dyn ParserHandle) -> Value {
    if parser.has_chunked_transfer_encoding() {
        Value::Str("chunked".to_string())
    } else if parser.content_length() > 0 {
        Value::UInt(parser.content_length())
    } else {
        Value::Null
    }
}

/// Folds parse events into durable message state and emits one trace record
/// per observed event.
pub struct Assembler {
    phase: Phase,
    ctx: MessageContext,
    max_field: usize,
}

impl Assembler {
    pub fn new(max_field: usize) -> Self {
        Self {
            phase: Phase::Idle,
            ctx: MessageContext::new(),
            max_field,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The assembled state of the in-flight message.
    pub fn context(&self) -> &MessageContext {
        &self.ctx
    }

    /// Mark the session terminal after an internal-contract fault.
    pub(crate) fn poison(&mut self) {
        self.phase = Phase::Error;
    }

    /// Entry point for a direct callback event.
    ///
    /// Aggregate kinds drain the pending offset batch first - every batched
    /// entry goes through the same per-kind handling as a direct event - and
    /// only then produce their own record.
    pub fn handle(
        &mut self,
        parser: &mut dyn ParserHandle,
        buf: &[u8],
        kind: EventKind,
        span: Span,
        sink: &mut dyn TraceSink,
    ) -> Result<()> {
        if self.phase == Phase::Error {
            return Ok(());
        }

        if kind.is_aggregate() {
            let pending = batch::take(parser);
            for raw in &pending {
                let event = batch::decode(raw)?;
                self.field_event(parser, buf, event.kind, event.span, sink)?;
            }
            self.aggregate(parser, buf, kind, span, sink)
        } else {
            self.field_event(parser, buf, kind, span, sink)
        }
    }

    /// Per-kind handling shared by direct callbacks and batch entries:
    /// capture the durable copy, then trace the raw event.
    fn field_event(
        &mut self,
        parser: &mut dyn ParserHandle,
        buf: &[u8],
        kind: EventKind,
        span: Span,
        sink: &mut dyn TraceSink,
    ) -> Result<()> {
        match kind {
            EventKind::MessageStart => {
                if self.phase == Phase::Idle {
                    self.ctx.release();
                    self.phase = Phase::InMessage;
                    tracing::trace!(pos = parser.position(), "message start");
                }
            }
            EventKind::Method => {
                self.require_in_message(kind)?;
                self.ctx.method = Some(self.copy(buf, span)?);
            }
            EventKind::Url => {
                self.require_in_message(kind)?;
                self.ctx.url = Some(self.copy(buf, span)?);
            }
            EventKind::Protocol => {
                self.require_in_message(kind)?;
                self.ctx.protocol = Some(self.copy(buf, span)?);
            }
            EventKind::Version => {
                self.require_in_message(kind)?;
                self.ctx.version = Some(self.copy(buf, span)?);
            }
            EventKind::Status => {
                self.require_in_message(kind)?;
                self.ctx.status = Some(self.copy(buf, span)?);
            }
            EventKind::Reason => {
                self.require_in_message(kind)?;
                self.ctx.reason = Some(self.copy(buf, span)?);
            }
            EventKind::HeaderName => {
                self.require_in_message(kind)?;
                let name = self.copy(buf, span)?;
                self.ctx.push_header_name(name);
            }
            EventKind::HeaderValue => {
                self.require_in_message(kind)?;
                let value = self.copy(buf, span)?;
                self.ctx.push_header_value(value);
            }
            EventKind::ChunkLength => {
                self.require_in_message(kind)?;
                self.ctx.chunk.length = Some(self.copy(buf, span)?);
            }
            EventKind::ChunkExtensionName => {
                self.require_in_message(kind)?;
                let name = self.copy(buf, span)?;
                self.ctx.chunk.push_extension_name(name);
            }
            EventKind::ChunkExtensionValue => {
                self.require_in_message(kind)?;
                let value = self.copy(buf, span)?;
                self.ctx.chunk.push_extension_value(value);
            }
            EventKind::TrailerName => {
                self.require_in_message(kind)?;
                let name = self.copy(buf, span)?;
                self.ctx.push_trailer_name(name);
            }
            EventKind::TrailerValue => {
                self.require_in_message(kind)?;
                let value = self.copy(buf, span)?;
                self.ctx.push_trailer_value(value);
            }
            // aggregate kinds reaching here arrived as batch entries; they
            // trace positionally, composites come from the direct callback
            EventKind::HeadersComplete
            | EventKind::Chunk
            | EventKind::Data
            | EventKind::Body
            | EventKind::Trailers
            | EventKind::MessageComplete => {
                self.require_in_message(kind)?;
            }
        }

        let record = Record::new(parser.position(), kind.as_str()).payload(payload_of(buf, span)?);
        sink.emit(&record);
        Ok(())
    }

    /// Direct aggregate handling, after the batch has been drained.
    fn aggregate(
        &mut self,
        parser: &mut dyn ParserHandle,
        buf: &[u8],
        kind: EventKind,
        span: Span,
        sink: &mut dyn TraceSink,
    ) -> Result<()> {
        self.require_in_message(kind)?;
        let pos = parser.position();

        match kind {
            EventKind::HeadersComplete => {
                let record = self.headers_record(parser, buf, span)?;
                sink.emit(&record);
                // method/url must not outlive the composite record
                self.ctx.clear_request_line();
            }
            EventKind::Chunk => {
                let meta = self.ctx.take_chunk();
                let size = meta.size().map(Value::UInt).unwrap_or(Value::Null);
                let extensions = meta
                    .extensions
                    .iter()
                    .map(|(name, value)| (name.to_text(), Value::Str(value.to_text())))
                    .collect();
                let record = Record::new(pos, kind.as_str())
                    .field("size", size)
                    .field("extensions", Value::Map(extensions))
                    .payload(payload_of(buf, span)?);
                sink.emit(&record);
            }
            EventKind::Data => {
                let record = Record::new(pos, kind.as_str()).payload(payload_of(buf, span)?);
                sink.emit(&record);
            }
            EventKind::Trailers => {
                let trailers = self
                    .ctx
                    .trailers
                    .iter()
                    .map(|(name, value)| (name.to_text(), Value::Str(value.to_text())))
                    .collect();
                let record = Record::new(pos, kind.as_str())
                    .field("trailers", Value::Map(trailers))
                    .payload(payload_of(buf, span)?);
                sink.emit(&record);
            }
            EventKind::MessageComplete => {
                let record = Record::new(pos, kind.as_str()).payload(payload_of(buf, span)?);
                sink.emit(&record);
                self.ctx.release();
                self.phase = Phase::Idle;
                tracing::trace!(pos, "message complete");
            }
            _ => unreachable!("non-aggregate kind in aggregate dispatch"),
        }
        Ok(())
    }

    /// The composite "headers complete" record.
    fn headers_record(
        &self,
        parser: &mut dyn ParserHandle,
        buf: &[u8],
        span: Span,
    ) -> Result<Record> {
        let mut record = Record::new(parser.position(), EventKind::HeadersComplete.as_str());

        if self.ctx.is_request() {
            record = record
                .field("type", "request")
                .field("method", text(&self.ctx.method))
                .field("url", text(&self.ctx.url));
        } else {
            record = record
                .field("type", "response")
                .field("status", parser.status())
                .field("reason", text(&self.ctx.reason));
        }

        Ok(record
            .field("protocol", text(&self.ctx.protocol))
            .field("version", text(&self.ctx.version))
            .field("body", body_mode(parser))
            .payload(payload_of(buf, span)?))
    }

    /// The parser failed: trace the structured error record and make the
    /// session terminal.
    pub(crate) fn fail(
        &mut self,
        parser: &mut dyn ParserHandle,
        buf: &[u8],
        span: Span,
        sink: &mut dyn TraceSink,
    ) -> Error {
        let record = Record::new(parser.position(), "error")
            .field("error_code", u64::from(parser.error_code()))
            .field("error_code_string", parser.error_code_name())
            .field("reason", parser.error_description().to_string())
            .payload(payload_of(buf, span).unwrap_or(None));
        sink.emit(&record);

        self.phase = Phase::Error;
        Error::Protocol {
            code: parser.error_code(),
            name: parser.error_code_name().to_string(),
            description: parser.error_description().to_string(),
        }
    }

    fn copy(&self, buf: &[u8], span: Span) -> Result<OwnedField> {
        capture(buf, span, self.max_field)
    }

    fn require_in_message(&self, kind: EventKind) -> Result<()> {
        if self.phase != Phase::InMessage {
            return Err(Error::UnexpectedEvent {
                event: kind.as_str(),
                phase: self.phase.as_str(),
            });
        }
        Ok(())
    }
}

fn text(field: &Option<OwnedField>) -> Value {
    match field {
        Some(field) => Value::Str(field.to_text()),
        None => Value::Null,
    }
}

/// Resolve a span into the record payload: `None` (rendered as `null`) for
/// zero-length spans, the copied text otherwise.
fn payload_of(buf: &[u8], span: Span) -> Result<Option<String>> {
    let slice = span.resolve(buf)?;
    if slice.is_empty() {
        Ok(None)
    } else {
        Ok(Some(String::from_utf8_lossy(slice).into_owned()))
    }
}
