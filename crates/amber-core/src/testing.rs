//! Deterministic collaborator double
//!
//! `ScriptedParser` replays a pre-built script of events, offset batches and
//! snapshot values against whatever buffer windows the caller feeds it. It
//! honors the collaborator contract: callbacks fire inline and in order,
//! spans are relative to the current buffer and never cross a `parse` call,
//! and a step only fires once every byte it references is inside the window.
//! Replaying the same input split at different boundaries therefore yields
//! the same trace, which is what the batching and span-lifetime tests rely
//! on.
//!
//! Consumption advances only at explicit checkpoints. Scripts must place a
//! checkpoint at or before the start of the next referenced span, so a span
//! never begins before the buffer the parser currently holds.

use crate::event::{EventKind, RawOffset};
use crate::parser::{EventSink, MessageKind, OffsetBatch, Parser, ParserHandle};
use crate::span::Span;
use smallvec::SmallVec;
use std::collections::VecDeque;

/// One scripted action. Positions are absolute stream offsets.
#[derive(Debug, Clone)]
enum Step {
    Event {
        kind: EventKind,
        start: usize,
        len: usize,
    },
    Offset {
        kind: u8,
        start: usize,
        len: usize,
    },
    Transition(&'static str),
    Kind(MessageKind),
    Status(u64),
    ContentLength(u64),
    Chunked(bool),
    Checkpoint(usize),
    Finish,
    Fail {
        code: u8,
        name: &'static str,
        description: &'static str,
    },
}

/// Builder for a parser script.
#[derive(Debug, Default, Clone)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire a direct event with the given absolute span.
    pub fn event(mut self, kind: EventKind, start: usize, len: usize) -> Self {
        self.steps.push(Step::Event { kind, start, len });
        self
    }

    /// Fire a zero-length event at `at`.
    pub fn mark(self, kind: EventKind, at: usize) -> Self {
        self.event(kind, at, 0)
    }

    /// Queue an offset-batch entry for the next aggregate drain.
    pub fn offset(mut self, kind: EventKind, start: usize, len: usize) -> Self {
        self.steps.push(Step::Offset {
            kind: kind.raw(),
            start,
            len,
        });
        self
    }

    /// Queue a batch entry with an arbitrary wire kind (for version-mismatch
    /// scenarios).
    pub fn raw_offset(mut self, kind: u8, start: usize, len: usize) -> Self {
        self.steps.push(Step::Offset { kind, start, len });
        self
    }

    /// Transition to a new symbolic state, firing before/after notifications.
    pub fn transition(mut self, state: &'static str) -> Self {
        self.steps.push(Step::Transition(state));
        self
    }

    pub fn message_kind(mut self, kind: MessageKind) -> Self {
        self.steps.push(Step::Kind(kind));
        self
    }

    pub fn status(mut self, status: u64) -> Self {
        self.steps.push(Step::Status(status));
        self
    }

    pub fn content_length(mut self, length: u64) -> Self {
        self.steps.push(Step::ContentLength(length));
        self
    }

    pub fn chunked(mut self, chunked: bool) -> Self {
        self.steps.push(Step::Chunked(chunked));
        self
    }

    /// Allow consumption to advance to the absolute position `at`.
    pub fn checkpoint(mut self, at: usize) -> Self {
        self.steps.push(Step::Checkpoint(at));
        self
    }

    /// Fire the finish notification.
    pub fn finish(mut self) -> Self {
        self.steps.push(Step::Finish);
        self
    }

    /// Fail with the given error snapshot; no further steps run.
    pub fn fail(mut self, code: u8, name: &'static str, description: &'static str) -> Self {
        self.steps.push(Step::Fail {
            code,
            name,
            description,
        });
        self
    }

    pub fn into_parser(self) -> ScriptedParser {
        ScriptedParser {
            steps: self.steps.into(),
            position: 0,
            base: 0,
            pending: SmallVec::new(),
            state: "START",
            kind: MessageKind::Unknown,
            status: 0,
            content_length: 0,
            chunked: false,
            error: None,
        }
    }
}

/// Scripted implementation of the parser contract.
pub struct ScriptedParser {
    steps: VecDeque<Step>,
    position: u64,
    base: usize,
    pending: SmallVec<[(u8, usize, usize); 16]>,
    state: &'static str,
    kind: MessageKind,
    status: u64,
    content_length: u64,
    chunked: bool,
    error: Option<(u8, &'static str, &'static str)>,
}

impl ParserHandle for ScriptedParser {
    fn position(&self) -> u64 {
        self.position
    }

    fn state_name(&self) -> &'static str {
        self.state
    }

    fn message_kind(&self) -> MessageKind {
        self.kind
    }

    fn status(&self) -> u64 {
        self.status
    }

    fn content_length(&self) -> u64 {
        self.content_length
    }

    fn has_chunked_transfer_encoding(&self) -> bool {
        self.chunked
    }

    fn error_code(&self) -> u8 {
        self.error.map(|(code, _, _)| code).unwrap_or(0)
    }

    fn error_code_name(&self) -> &'static str {
        self.error.map(|(_, name, _)| name).unwrap_or("NONE")
    }

    fn error_description(&self) -> &str {
        self.error.map(|(_, _, description)| description).unwrap_or("")
    }

    fn drain_offsets(&mut self) -> OffsetBatch {
        self.pending
            .iter()
            .map(|&(kind, start, len)| RawOffset {
                kind,
                start: start.saturating_sub(self.base),
                len,
            })
            .collect()
    }

    fn clear_offsets(&mut self) {
        self.pending.clear();
    }
}

impl Parser for ScriptedParser {
    fn parse(&mut self, buf: &[u8], sink: &mut dyn EventSink) -> usize {
        if self.error.is_some() {
            return 0;
        }

        let entry = self.position as usize;
        self.base = entry;
        let window_end = entry + buf.len();
        let mut consumed_to = entry;

        loop {
            let step = match self.steps.front() {
                Some(step) => step.clone(),
                None => break,
            };

            match step {
                Step::Event { kind, start, len } => {
                    if start + len > window_end {
                        break;
                    }
                    self.steps.pop_front();
                    let span = Span::new(start.saturating_sub(self.base), len);
                    sink.on_event(self, kind, span);
                }
                Step::Offset { kind, start, len } => {
                    if start + len > window_end {
                        break;
                    }
                    self.steps.pop_front();
                    self.pending.push((kind, start, len));
                }
                Step::Checkpoint(at) => {
                    if at > window_end {
                        break;
                    }
                    self.steps.pop_front();
                    consumed_to = at;
                    self.position = at as u64;
                }
                Step::Transition(state) => {
                    self.steps.pop_front();
                    sink.before_state_change(self, Span::EMPTY);
                    self.state = state;
                    sink.after_state_change(self, Span::EMPTY);
                }
                Step::Kind(kind) => {
                    self.steps.pop_front();
                    self.kind = kind;
                }
                Step::Status(status) => {
                    self.steps.pop_front();
                    self.status = status;
                }
                Step::ContentLength(length) => {
                    self.steps.pop_front();
                    self.content_length = length;
                }
                Step::Chunked(chunked) => {
                    self.steps.pop_front();
                    self.chunked = chunked;
                }
                Step::Finish => {
                    self.steps.pop_front();
                    sink.on_finish(self, Span::EMPTY);
                }
                Step::Fail {
                    code,
                    name,
                    description,
                } => {
                    self.steps.pop_front();
                    self.error = Some((code, name, description));
                    self.state = "ERROR";
                    sink.on_error(self, Span::EMPTY);
                    break;
                }
            }
        }

        consumed_to - entry
    }
}
