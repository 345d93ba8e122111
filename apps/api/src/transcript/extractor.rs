//! Transcript Extractor: produces one normalized, speaker-labelled transcript.
//!
//! Structured artifact messages win over flat transcript strings because their
//! roles are explicit; the flat strings are only consulted when no message
//! array produced any line.

use crate::models::call::{ArtifactRecord, CallRecord, Role};

/// Returns `"AI: …"` / `"Student: …"` lines joined by newlines, or an empty
/// string when nothing usable was sent.
pub fn extract(
    call: Option<&CallRecord>,
    artifact: Option<&ArtifactRecord>,
    message_transcript: Option<&str>,
) -> String {
    if let Some(artifact) = artifact {
        let from_messages = normalize_messages(artifact);
        if !from_messages.is_empty() {
            return from_messages;
        }
    }

    [
        call.and_then(|c| c.transcript.as_deref()),
        artifact.and_then(|a| a.transcript.as_deref()),
        message_transcript,
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|t| !t.is_empty())
    .unwrap_or_default()
    .to_string()
}

fn normalize_messages(artifact: &ArtifactRecord) -> String {
    artifact
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .filter_map(|m| {
            m.text()
                .map(|content| format!("{}: {}", m.role.label(), content))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
