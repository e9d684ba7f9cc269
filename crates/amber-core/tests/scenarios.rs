//! End-to-end scenarios: a scripted parser drives a full session and the
//! rendered trace is checked line by line.

use amber_core::testing::{Script, ScriptedParser};
use amber_core::{
    Error, EventKind, EventSink, MessageKind, OffsetBatch, Parser, ParserHandle, Phase, Session,
    SessionConfig, Span,
};
use amber_trace::{MemorySink, Value};

fn session(script: Script) -> Session<ScriptedParser, MemorySink> {
    Session::new(script.into_parser(), MemorySink::new())
}

/// Feed `input` in windows of at most `chunk` bytes, re-presenting
/// unconsumed bytes the way a streaming caller would.
fn feed_chunks(session: &mut Session<ScriptedParser, MemorySink>, input: &[u8], chunk: usize) -> usize {
    let mut start = 0;
    let mut end = 0;
    loop {
        end = (end + chunk).min(input.len());
        let consumed = session.feed(&input[start..end]).unwrap();
        start += consumed;
        if start == input.len() {
            return start;
        }
        if end == input.len() && consumed == 0 {
            panic!("parser stalled at {}", start);
        }
    }
}

const SIMPLE_GET: &[u8] = b"GET / HTTP/1.1\r\n\r\n";

fn simple_get_script() -> Script {
    Script::new()
        .mark(EventKind::MessageStart, 0)
        .event(EventKind::Method, 0, 3)
        .checkpoint(4)
        .event(EventKind::Url, 4, 1)
        .checkpoint(6)
        .event(EventKind::Protocol, 6, 4)
        .event(EventKind::Version, 11, 3)
        .checkpoint(16)
        .mark(EventKind::HeadersComplete, 18)
        .checkpoint(18)
        .mark(EventKind::MessageComplete, 18)
        .finish()
}

const CHUNKED_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nTrailer: x-trailer\r\n\r\nc;need=love\r\nhello world!\r\n0\r\nX-Trailer: value\r\n\r\n";

fn chunked_response_script() -> Script {
    Script::new()
        .mark(EventKind::MessageStart, 0)
        .event(EventKind::Protocol, 0, 4)
        .event(EventKind::Version, 5, 3)
        .event(EventKind::Status, 9, 3)
        .event(EventKind::Reason, 13, 2)
        .message_kind(MessageKind::Response)
        .status(200)
        .checkpoint(17)
        .event(EventKind::HeaderName, 17, 17)
        .event(EventKind::HeaderValue, 36, 7)
        .chunked(true)
        .checkpoint(45)
        .event(EventKind::HeaderName, 45, 7)
        .event(EventKind::HeaderValue, 54, 9)
        .checkpoint(65)
        .mark(EventKind::HeadersComplete, 67)
        .checkpoint(67)
        .offset(EventKind::ChunkLength, 67, 1)
        .offset(EventKind::ChunkExtensionName, 69, 4)
        .offset(EventKind::ChunkExtensionValue, 74, 4)
        .mark(EventKind::Chunk, 80)
        .checkpoint(80)
        .event(EventKind::Data, 80, 12)
        .checkpoint(94)
        .event(EventKind::ChunkLength, 94, 1)
        .mark(EventKind::Chunk, 97)
        .checkpoint(97)
        .offset(EventKind::TrailerName, 97, 9)
        .offset(EventKind::TrailerValue, 108, 5)
        .mark(EventKind::Trailers, 117)
        .checkpoint(117)
        .mark(EventKind::MessageComplete, 117)
        .finish()
}

#[test]
fn test_simple_get_end_to_end() {
    let mut session = session(simple_get_script());
    let consumed = session.feed(SIMPLE_GET).unwrap();
    assert_eq!(consumed, SIMPLE_GET.len());
    assert_eq!(session.parser().position(), 18);
    assert_eq!(session.assembler().phase(), Phase::Idle);

    let sink = session.into_sink();
    assert_eq!(
        sink.events(),
        vec![
            "message_start",
            "method",
            "url",
            "protocol",
            "version",
            "headers_complete",
            "message_complete",
            "finish",
        ]
    );

    // zero-length spans render null, one-byte spans render the byte
    assert_eq!(sink.find("message_start").unwrap().data(), None);
    assert_eq!(sink.find("method").unwrap().data(), Some("GET"));
    assert_eq!(sink.find("url").unwrap().data(), Some("/"));
    assert_eq!(sink.find("version").unwrap().data(), Some("1.1"));

    let composite = sink.find("headers_complete").unwrap();
    assert_eq!(
        amber_trace::render(composite).unwrap(),
        r#"{"pos":16,"event":"headers_complete","type":"request","method":"GET","url":"/","protocol":"HTTP","version":"1.1","body":null,"data":null}"#
    );
}

#[test]
fn test_chunked_response_trace() {
    let mut session = session(chunked_response_script());
    let consumed = session.feed(CHUNKED_RESPONSE).unwrap();
    assert_eq!(consumed, CHUNKED_RESPONSE.len());
    assert_eq!(session.assembler().phase(), Phase::Idle);

    let sink = session.into_sink();

    let composite = sink.find("headers_complete").unwrap();
    assert_eq!(
        amber_trace::render(composite).unwrap(),
        r#"{"pos":65,"event":"headers_complete","type":"response","status":200,"reason":"OK","protocol":"HTTP","version":"1.1","body":"chunked","data":null}"#
    );

    // chunk length arrives as raw hex text, the composite decodes it
    let lengths: Vec<&amber_trace::Record> = sink
        .records()
        .iter()
        .filter(|record| record.event() == "chunk_length")
        .collect();
    assert_eq!(lengths.len(), 2);
    assert_eq!(lengths[0].data(), Some("c"));
    assert_eq!(lengths[1].data(), Some("0"));

    let chunks: Vec<&amber_trace::Record> = sink
        .records()
        .iter()
        .filter(|record| record.event() == "chunk")
        .collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].get("size"), Some(&Value::UInt(12)));
    assert_eq!(
        chunks[0].get("extensions"),
        Some(&Value::Map(vec![(
            "need".to_string(),
            Value::Str("love".to_string())
        )]))
    );
    assert_eq!(chunks[1].get("size"), Some(&Value::UInt(0)));

    assert_eq!(sink.find("data").unwrap().data(), Some("hello world!"));

    let trailers = sink.find("trailers").unwrap();
    assert_eq!(
        trailers.get("trailers"),
        Some(&Value::Map(vec![(
            "X-Trailer".to_string(),
            Value::Str("value".to_string())
        )]))
    );

    // message_complete follows trailers, never precedes it
    let events = sink.events();
    let trailers_at = events.iter().position(|event| *event == "trailers").unwrap();
    let complete_at = events
        .iter()
        .position(|event| *event == "message_complete")
        .unwrap();
    assert!(trailers_at < complete_at);
}

#[test]
fn test_split_replay_identical() {
    let whole = {
        let mut session = session(chunked_response_script());
        assert_eq!(session.feed(CHUNKED_RESPONSE).unwrap(), CHUNKED_RESPONSE.len());
        session.into_sink().lines().to_vec()
    };

    for chunk in [1, 7, 13, 64] {
        let mut session = session(chunked_response_script());
        let consumed = feed_chunks(&mut session, CHUNKED_RESPONSE, chunk);
        assert_eq!(consumed, CHUNKED_RESPONSE.len());
        assert_eq!(
            session.into_sink().lines(),
            whole.as_slice(),
            "trace differs for chunk size {}",
            chunk
        );
    }
}

#[test]
fn test_batched_and_direct_delivery_equivalent() {
    // same method event, once as a direct callback, once as a batch entry
    // drained at headers_complete
    let direct = Script::new()
        .mark(EventKind::MessageStart, 0)
        .event(EventKind::Method, 0, 3)
        .mark(EventKind::HeadersComplete, 4);
    let batched = Script::new()
        .mark(EventKind::MessageStart, 0)
        .offset(EventKind::Method, 0, 3)
        .mark(EventKind::HeadersComplete, 4);

    let mut lines = Vec::new();
    for script in [direct, batched] {
        let mut session = session(script);
        session.feed(b"GET ").unwrap();
        lines.push(session.into_sink().lines().to_vec());
    }
    assert_eq!(lines[0], lines[1]);
}

#[test]
fn test_pipelined_messages_isolated() {
    let input: &[u8] = b"GET /first HTTP/1.1\r\n\r\nHTTP/1.1 204 No Content\r\n\r\n";
    let script = Script::new()
        .mark(EventKind::MessageStart, 0)
        .event(EventKind::Method, 0, 3)
        .checkpoint(4)
        .event(EventKind::Url, 4, 6)
        .checkpoint(11)
        .event(EventKind::Protocol, 11, 4)
        .event(EventKind::Version, 16, 3)
        .checkpoint(19)
        .mark(EventKind::HeadersComplete, 23)
        .checkpoint(23)
        .mark(EventKind::MessageComplete, 23)
        .mark(EventKind::MessageStart, 23)
        .event(EventKind::Protocol, 23, 4)
        .event(EventKind::Version, 28, 3)
        .event(EventKind::Status, 32, 3)
        .event(EventKind::Reason, 36, 10)
        .message_kind(MessageKind::Response)
        .status(204)
        .checkpoint(46)
        .mark(EventKind::HeadersComplete, 50)
        .checkpoint(50)
        .mark(EventKind::MessageComplete, 50)
        .finish();

    let mut session = session(script);
    assert_eq!(session.feed(input).unwrap(), input.len());
    assert_eq!(session.assembler().phase(), Phase::Idle);

    let sink = session.into_sink();
    let composites: Vec<&amber_trace::Record> = sink
        .records()
        .iter()
        .filter(|record| record.event() == "headers_complete")
        .collect();
    assert_eq!(composites.len(), 2);

    assert_eq!(
        composites[0].get("type"),
        Some(&Value::Str("request".to_string()))
    );
    assert_eq!(
        composites[0].get("url"),
        Some(&Value::Str("/first".to_string()))
    );

    // nothing captured for message 1 leaks into message 2's composite
    assert_eq!(
        composites[1].get("type"),
        Some(&Value::Str("response".to_string()))
    );
    assert_eq!(composites[1].get("method"), None);
    assert_eq!(composites[1].get("url"), None);
    assert_eq!(composites[1].get("status"), Some(&Value::UInt(204)));
    assert_eq!(
        composites[1].get("reason"),
        Some(&Value::Str("No Content".to_string()))
    );
    let second_line = amber_trace::render(composites[1]).unwrap();
    assert!(!second_line.contains("first"));
}

#[test]
fn test_body_mode_chunked_wins_over_content_length() {
    let script = Script::new()
        .mark(EventKind::MessageStart, 0)
        .event(EventKind::Protocol, 0, 4)
        .event(EventKind::Version, 5, 3)
        .event(EventKind::Status, 9, 3)
        .event(EventKind::Reason, 13, 2)
        .message_kind(MessageKind::Response)
        .status(200)
        .chunked(true)
        .content_length(5)
        .mark(EventKind::HeadersComplete, 17)
        .checkpoint(17);

    let mut session = session(script);
    session.feed(b"HTTP/1.1 200 OK\r\n").unwrap();

    let sink = session.into_sink();
    let composite = sink.find("headers_complete").unwrap();
    assert_eq!(
        composite.get("body"),
        Some(&Value::Str("chunked".to_string()))
    );
}

#[test]
fn test_unknown_offset_kind_is_fatal() {
    let script = Script::new()
        .mark(EventKind::MessageStart, 0)
        .raw_offset(99, 0, 0)
        .mark(EventKind::MessageComplete, 0);

    let mut session = session(script);
    let err = session.feed(b"").unwrap_err();
    assert!(matches!(err, Error::UnknownOffsetKind(99)));
    assert_eq!(session.assembler().phase(), Phase::Error);

    let err = session.feed(b"more").unwrap_err();
    assert!(matches!(err, Error::SessionTerminated));
}

#[test]
fn test_protocol_error_is_terminal() {
    let script = Script::new()
        .mark(EventKind::MessageStart, 0)
        .fail(8, "UNEXPECTED_CHARACTER", "unexpected character");

    let mut session = session(script);
    let err = session.feed(b"x").unwrap_err();
    assert!(matches!(err, Error::Protocol { code: 8, .. }));

    {
        let sink = session.sink();
        let error = sink.find("error").unwrap();
        assert_eq!(
            amber_trace::render(error).unwrap(),
            r#"{"pos":0,"event":"error","error_code":8,"error_code_string":"UNEXPECTED_CHARACTER","reason":"unexpected character","data":null}"#
        );
    }

    let err = session.feed(b"y").unwrap_err();
    assert!(matches!(err, Error::SessionTerminated));
}

#[test]
fn test_state_change_records_and_toggle() {
    let script = || {
        Script::new()
            .mark(EventKind::MessageStart, 0)
            .transition("REQUEST")
            .mark(EventKind::MessageComplete, 0)
            .finish()
    };

    let mut session = session(script());
    session.feed(b"").unwrap();
    let sink = session.into_sink();
    assert_eq!(
        sink.events(),
        vec![
            "message_start",
            "before_state_change",
            "after_state_change",
            "message_complete",
            "finish",
        ]
    );
    assert_eq!(
        sink.find("before_state_change").unwrap().get("current_state"),
        Some(&Value::Str("START".to_string()))
    );
    assert_eq!(
        sink.find("after_state_change").unwrap().get("current_state"),
        Some(&Value::Str("REQUEST".to_string()))
    );

    // diagnostics off: state-change records vanish, nothing else does
    let mut session = Session::with_config(
        script().into_parser(),
        MemorySink::new(),
        SessionConfig::new().state_changes(false),
    );
    session.feed(b"").unwrap();
    assert_eq!(
        session.into_sink().events(),
        vec!["message_start", "message_complete", "finish"]
    );
}

/// A parser that violates the span contract: the resolver must fault and the
/// session must go terminal instead of returning a bad slice.
struct BrokenParser;

impl ParserHandle for BrokenParser {
    fn position(&self) -> u64 {
        0
    }

    fn state_name(&self) -> &'static str {
        "START"
    }

    fn message_kind(&self) -> MessageKind {
        MessageKind::Unknown
    }

    fn status(&self) -> u64 {
        0
    }

    fn content_length(&self) -> u64 {
        0
    }

    fn has_chunked_transfer_encoding(&self) -> bool {
        false
    }

    fn error_code(&self) -> u8 {
        0
    }

    fn error_code_name(&self) -> &'static str {
        "NONE"
    }

    fn error_description(&self) -> &str {
        ""
    }

    fn drain_offsets(&mut self) -> OffsetBatch {
        OffsetBatch::new()
    }

    fn clear_offsets(&mut self) {}
}

impl Parser for BrokenParser {
    fn parse(&mut self, buf: &[u8], sink: &mut dyn EventSink) -> usize {
        sink.on_event(self, EventKind::MessageStart, Span::EMPTY);
        sink.on_event(self, EventKind::Method, Span::new(0, buf.len() + 8));
        buf.len()
    }
}

#[test]
fn test_span_out_of_bounds_is_fatal() {
    let mut session = Session::new(BrokenParser, MemorySink::new());
    let err = session.feed(b"GET").unwrap_err();
    assert!(matches!(
        err,
        Error::SpanOutOfBounds {
            start: 0,
            len: 11,
            buffer: 3
        }
    ));
    assert_eq!(session.assembler().phase(), Phase::Error);
    assert!(matches!(
        session.feed(b"GET").unwrap_err(),
        Error::SessionTerminated
    ));
}
