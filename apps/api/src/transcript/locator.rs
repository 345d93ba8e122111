//! Payload Locator: finds the call and artifact objects regardless of which
//! nesting shape the sender used, and projects them into the typed model.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::call::{ArtifactRecord, CallRecord};

/// Candidate locations of the call object, probed in order.
const CALL_PATHS: &[&[&str]] = &[
    &["message", "call"],
    &["call"],
    &["data", "call"],
    &["event", "call"],
];

/// Candidate locations of the artifact object, probed in order.
const ARTIFACT_PATHS: &[&[&str]] = &[&["message", "artifact"], &["artifact"], &["data", "artifact"]];

const TYPE_PATHS: &[&[&str]] = &[&["message", "type"], &["type"]];

/// The webhook's `message.type`, as a closed set of variants the controller
/// can match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    AssistantRequest,
    EndOfCallReport,
    Other(String),
    Missing,
}

impl EventKind {
    pub fn from_type(message_type: Option<&str>) -> Self {
        match message_type.map(str::trim) {
            None | Some("") => EventKind::Missing,
            Some("assistant-request") => EventKind::AssistantRequest,
            Some("end-of-call-report") => EventKind::EndOfCallReport,
            Some(other) => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EventKind::AssistantRequest => Some("assistant-request"),
            EventKind::EndOfCallReport => Some("end-of-call-report"),
            EventKind::Other(t) => Some(t),
            EventKind::Missing => None,
        }
    }
}

/// Typed view of an inbound event. Downstream components only see this.
#[derive(Debug, Clone)]
pub struct LocatedEvent {
    pub kind: EventKind,
    pub call: Option<CallRecord>,
    pub artifact: Option<ArtifactRecord>,
    /// `message.metadata`, used as a metadata fallback.
    pub metadata: Map<String, Value>,
    /// `message.transcript`, the last transcript fallback.
    pub transcript: Option<String>,
    /// `message.recordingUrl`, the last recording URL fallback.
    pub recording_url: Option<String>,
}

pub fn locate(event: &Value) -> LocatedEvent {
    let message_type = TYPE_PATHS
        .iter()
        .find_map(|path| probe(event, path))
        .and_then(Value::as_str);

    let message = event.get("message");
    let message_str = |key: &str| {
        message
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    LocatedEvent {
        kind: EventKind::from_type(message_type),
        call: first_typed(event, CALL_PATHS, "call"),
        artifact: first_typed(event, ARTIFACT_PATHS, "artifact"),
        metadata: message
            .and_then(|m| m.get("metadata"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        transcript: message_str("transcript"),
        recording_url: message_str("recordingUrl"),
    }
}

/// Walks `path` through nested objects; `null` counts as absent.
fn probe<'a>(event: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(event, |node, key| node.get(*key))
        .filter(|v| !v.is_null())
}

fn first_typed<T: DeserializeOwned>(event: &Value, paths: &[&[&str]], what: &str) -> Option<T> {
    let raw = paths
        .iter()
        .filter_map(|path| probe(event, path))
        .find(|v| v.is_object())?;
    match serde_json::from_value(raw.clone()) {
        Ok(typed) => Some(typed),
        Err(e) => {
            warn!("Could not read {what} object from webhook payload: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finds_call_under_message() {
        let located = locate(&json!({
            "message": {
                "type": "end-of-call-report",
                "call": {"id": "c-1", "status": "ended"},
                "artifact": {"transcript": "AI: Hi"}
            }
        }));
        assert_eq!(located.kind, EventKind::EndOfCallReport);
        assert_eq!(located.call.unwrap().id.as_deref(), Some("c-1"));
        assert_eq!(located.artifact.unwrap().transcript.as_deref(), Some("AI: Hi"));
    }

    #[test]
    fn test_finds_call_at_each_known_location() {
        for event in [
            json!({"call": {"id": "x"}}),
            json!({"data": {"call": {"id": "x"}}}),
            json!({"event": {"call": {"id": "x"}}}),
        ] {
            let located = locate(&event);
            assert_eq!(located.call.unwrap().id.as_deref(), Some("x"), "{event}");
        }
    }

    #[test]
    fn test_message_call_takes_priority() {
        let located = locate(&json!({
            "message": {"call": {"id": "from-message"}},
            "call": {"id": "top-level"},
            "data": {"call": {"id": "data"}}
        }));
        assert_eq!(located.call.unwrap().id.as_deref(), Some("from-message"));
    }

    #[test]
    fn test_null_candidate_is_skipped() {
        let located = locate(&json!({
            "message": {"call": null},
            "call": {"id": "second"}
        }));
        assert_eq!(located.call.unwrap().id.as_deref(), Some("second"));
    }

    #[test]
    fn test_artifact_locations() {
        let located = locate(&json!({"data": {"artifact": {"transcript": "t"}}}));
        assert_eq!(located.artifact.unwrap().transcript.as_deref(), Some("t"));

        let located = locate(&json!({
            "message": {"artifact": {"transcript": "first"}},
            "artifact": {"transcript": "second"}
        }));
        assert_eq!(located.artifact.unwrap().transcript.as_deref(), Some("first"));
    }

    #[test]
    fn test_absent_call_is_not_an_error() {
        let located = locate(&json!({"message": {"type": "status-update"}}));
        assert!(located.call.is_none());
        assert!(located.artifact.is_none());
        assert_eq!(located.kind, EventKind::Other("status-update".to_string()));
    }

    #[test]
    fn test_message_level_fallback_fields() {
        let located = locate(&json!({
            "message": {
                "transcript": "AI: Q?",
                "recordingUrl": "https://rec",
                "metadata": {"studentName": "Ravi"}
            }
        }));
        assert_eq!(located.kind, EventKind::Missing);
        assert_eq!(located.transcript.as_deref(), Some("AI: Q?"));
        assert_eq!(located.recording_url.as_deref(), Some("https://rec"));
        assert_eq!(located.metadata["studentName"], "Ravi");
    }

    #[test]
    fn test_top_level_type_is_accepted() {
        let located = locate(&json!({"type": "assistant-request"}));
        assert_eq!(located.kind, EventKind::AssistantRequest);
    }

    #[test]
    fn test_event_kind_round_trips_type_string() {
        assert_eq!(EventKind::from_type(Some("")).as_str(), None);
        assert_eq!(
            EventKind::from_type(Some("transcript")).as_str(),
            Some("transcript")
        );
    }
}
