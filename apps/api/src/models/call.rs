//! Typed projection of the call platform's webhook payload.
//!
//! The platform's JSON is loosely structured and changes shape between event
//! types, so every field here is optional and deserialized leniently: a field
//! carrying an unexpected JSON type is treated as absent instead of failing the
//! whole record.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Lifecycle status reported on the call object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Ringing,
    InProgress,
    Forwarding,
    Ended,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl CallStatus {
    /// `ended` and `completed` both mean the call is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Ended | CallStatus::Completed)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOverrides {
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub variable_values: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantConfig {
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<Map<String, Value>>,
}

/// The call object, wherever the sender nested it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<CallStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub started_at: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ended_at: Option<String>,
    #[serde(default, alias = "durationSeconds", deserialize_with = "lenient")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub assistant_overrides: Option<AssistantOverrides>,
    #[serde(default, deserialize_with = "lenient")]
    pub assistant: Option<AssistantConfig>,
    #[serde(default, deserialize_with = "lenient")]
    pub transcript: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub recording_url: Option<String>,
}

impl CallRecord {
    pub fn is_ended(&self) -> bool {
        self.status.as_ref().is_some_and(CallStatus::is_terminal)
    }

    /// Call length in whole seconds. Uses the reported duration when present,
    /// otherwise the difference between the start and end timestamps.
    pub fn duration_secs(&self) -> Option<u64> {
        if let Some(d) = self.duration.filter(|d| d.is_finite() && *d >= 0.0) {
            return Some(d.round() as u64);
        }
        let started = parse_timestamp(self.started_at.as_deref()?)?;
        let ended = parse_timestamp(self.ended_at.as_deref()?)?;
        u64::try_from((ended - started).num_seconds()).ok()
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Speaker of a single artifact message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    Ai,
    Student,
}

impl Role {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "system" => Role::System,
            "bot" | "assistant" | "ai" => Role::Ai,
            _ => Role::Student,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::Ai => "AI",
            Role::Student => "Student",
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Role::from_label(&label))
    }
}

/// One conversation entry. The platform sends the text as `message`, as
/// `content`, or as both.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
}

impl ArtifactMessage {
    /// First non-blank of `message` and `content`, trimmed.
    pub fn text(&self) -> Option<&str> {
        [self.message.as_deref(), self.content.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
    }
}

/// The platform's structured record of the conversation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    #[serde(default, deserialize_with = "lenient_messages")]
    pub messages: Vec<ArtifactMessage>,
    #[serde(default, deserialize_with = "lenient")]
    pub transcript: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub recording_url: Option<String>,
}

/// Deserializes an optional field, mapping type mismatches to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Keeps every message entry that parses and drops the rest (tool calls,
/// function results and other shapes the transcript has no use for).
fn lenient_messages<'de, D>(deserializer: D) -> Result<Vec<ArtifactMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let entries = match value {
        Some(Value::Array(entries)) => entries,
        _ => return Ok(Vec::new()),
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}
