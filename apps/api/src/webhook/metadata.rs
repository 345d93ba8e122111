//! Student metadata lookup across the places the platform may carry it.

use serde_json::{Map, Value};

use crate::transcript::locator::LocatedEvent;

pub const DEFAULT_STUDENT_NAME: &str = "Unknown";
pub const DEFAULT_SUBJECT: &str = "Unknown Subject";

type MetadataSource = fn(&LocatedEvent) -> Option<&Map<String, Value>>;

fn call_metadata(event: &LocatedEvent) -> Option<&Map<String, Value>> {
    event.call.as_ref()?.metadata.as_ref()
}

fn overrides_metadata(event: &LocatedEvent) -> Option<&Map<String, Value>> {
    event.call.as_ref()?.assistant_overrides.as_ref()?.metadata.as_ref()
}

fn assistant_metadata(event: &LocatedEvent) -> Option<&Map<String, Value>> {
    event.call.as_ref()?.assistant.as_ref()?.metadata.as_ref()
}

fn message_metadata(event: &LocatedEvent) -> Option<&Map<String, Value>> {
    Some(&event.metadata)
}

fn variable_values(event: &LocatedEvent) -> Option<&Map<String, Value>> {
    event
        .call
        .as_ref()?
        .assistant_overrides
        .as_ref()?
        .variable_values
        .as_ref()
}

/// Sources in priority order; the first non-empty value wins.
const METADATA_SOURCES: &[MetadataSource] = &[
    call_metadata,
    overrides_metadata,
    assistant_metadata,
    message_metadata,
    variable_values,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentMetadata {
    pub email: String,
    pub name: String,
    pub subject: String,
    pub topics: String,
}

impl StudentMetadata {
    pub fn from_event(event: &LocatedEvent) -> Self {
        Self {
            email: lookup(event, &["studentEmail", "student_email"]).unwrap_or_default(),
            name: lookup(event, &["studentName", "student_name"])
                .unwrap_or_else(|| DEFAULT_STUDENT_NAME.to_string()),
            subject: lookup(event, &["subject"]).unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            topics: lookup(event, &["topics"]).unwrap_or_default(),
        }
    }
}

/// First non-empty value for any of `keys`, walking the sources in order.
pub fn lookup(event: &LocatedEvent, keys: &[&str]) -> Option<String> {
    METADATA_SOURCES
        .iter()
        .filter_map(|source| source(event))
        .find_map(|map| keys.iter().find_map(|key| map.get(*key).and_then(value_text)))
}

/// Text form of a metadata value. Lists (e.g. topics) are comma-joined.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}
