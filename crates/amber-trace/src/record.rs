//! Trace record model
//!
//! A `Record` is the durable, structured form of one parser event: stream
//! position, event name, ordered event-specific fields and an optional
//! payload. It borrows nothing from the parse buffer; every value is an
//! owned copy taken before the buffer could change.

/// A single field value inside a trace record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text value (payloads are lossy-decoded if not valid UTF-8)
    Str(String),
    /// Unsigned number (positions, lengths, status codes)
    UInt(u64),
    /// Explicit null, e.g. "no body expected"
    Null,
    /// Nested name/value map, rendered in insertion order
    Map(Vec<(String, Value)>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

/// One structured trace record.
///
/// Built once via the consuming builder methods, then rendered; there is no
/// mutable access after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pos: u64,
    event: &'static str,
    fields: Vec<(&'static str, Value)>,
    payload: Option<String>,
}

impl Record {
    /// Create a record for `event` observed at stream position `pos`.
    pub fn new(pos: u64, event: &'static str) -> Self {
        Self {
            pos,
            event,
            fields: Vec::new(),
            payload: None,
        }
    }

    /// Attach an event-specific field. Fields render in attachment order.
    pub fn field(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    /// Attach the payload carried by the triggering span.
    /// `None` renders as `"data": null`.
    pub fn payload(mut self, payload: Option<String>) -> Self {
        self.payload = payload;
        self
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn event(&self) -> &'static str {
        self.event
    }

    pub fn fields(&self) -> &[(&'static str, Value)] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn data(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}
