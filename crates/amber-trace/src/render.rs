//! JSON rendering of trace records
//!
//! One record becomes one JSON object in a fixed key order: `pos`, `event`,
//! the event-specific fields in attachment order, `data` last. Serialization
//! goes through serde so string escaping is correct for arbitrary payload
//! bytes.

use crate::record::{Record, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Str(text) => serializer.serialize_str(text),
            Value::UInt(number) => serializer.serialize_u64(*number),
            Value::Null => serializer.serialize_unit(),
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, value) in entries {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields().len() + 3))?;
        map.serialize_entry("pos", &self.pos())?;
        map.serialize_entry("event", self.event())?;
        for (name, value) in self.fields() {
            map.serialize_entry(name, value)?;
        }
        // data always last, null when the triggering span was empty
        map.serialize_entry("data", &self.data())?;
        map.end()
    }
}

/// Render one record as a single JSON line (without trailing newline).
pub fn render(record: &Record) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}
