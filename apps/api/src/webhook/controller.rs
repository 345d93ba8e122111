//! Event classification and the end-of-call pipeline.
//!
//! Flow: classify → (Process only) call id → metadata → extract → parse →
//!       evaluate → persist with bounded retry → response.

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::evaluation::Evaluation;
use crate::models::result::{CallSummary, ResultRecord};
use crate::results::sink::{SinkError, SyncStatus};
use crate::state::AppState;
use crate::transcript::extractor::extract;
use crate::transcript::locator::{EventKind, LocatedEvent};
use crate::transcript::parser::parse;
use crate::webhook::metadata::StudentMetadata;
use crate::webhook::retry::retry_with_delay;

const EVALUATION_FAILED_FEEDBACK: &str = "Automatic evaluation failed; marks need manual review.";

/// What to do with an inbound event. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    /// Needs a synchronous assistant configuration; answered empty.
    AssistantRequest,
    /// Intermediate event (status update, partial transcript, …).
    NonTerminal(Option<String>),
    /// Terminal event, but no call object could be found.
    NoCallData,
    Process,
}

/// Terminal when the type is `end-of-call-report`, or when no type was sent
/// and the call itself reports `ended`/`completed`. Any other explicit type
/// is intermediate regardless of the call status.
pub fn classify(event: &LocatedEvent) -> WebhookAction {
    match &event.kind {
        EventKind::AssistantRequest => WebhookAction::AssistantRequest,
        EventKind::Other(message_type) => WebhookAction::NonTerminal(Some(message_type.clone())),
        EventKind::EndOfCallReport if event.call.is_some() => WebhookAction::Process,
        EventKind::EndOfCallReport => WebhookAction::NoCallData,
        EventKind::Missing => match &event.call {
            None => WebhookAction::NoCallData,
            Some(call) if call.is_ended() => WebhookAction::Process,
            Some(_) => WebhookAction::NonTerminal(None),
        },
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub questions_answered: usize,
    pub total_marks: f64,
    pub max_total_marks: f64,
    pub percentage: f64,
}

impl From<&Evaluation> for EvaluationSummary {
    fn from(e: &Evaluation) -> Self {
        Self {
            questions_answered: e.questions_answered(),
            total_marks: e.total_marks,
            max_total_marks: e.max_total_marks,
            percentage: e.percentage,
        }
    }
}

/// Body of the 200 answer to a processed event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedResponse {
    pub success: bool,
    pub call_id: String,
    pub evaluation: EvaluationSummary,
    pub sheets_saved: bool,
    pub sync_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_note: Option<&'static str>,
}

impl ProcessedResponse {
    fn new(call_id: String, evaluation: &Evaluation, sync: &Result<SyncStatus, SinkError>) -> Self {
        Self {
            success: true,
            call_id,
            evaluation: evaluation.into(),
            sheets_saved: sync.is_ok(),
            sync_status: match sync {
                Ok(status) => status.as_str(),
                Err(_) => "failed",
            },
            sync_note: sync.as_ref().ok().and_then(SyncStatus::note),
        }
    }
}

/// `call.id`, or a time-based key so every processed event has one.
fn call_id_for(event: &LocatedEvent) -> String {
    event
        .call
        .as_ref()
        .and_then(|c| c.id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("unknown-{}", Utc::now().timestamp_millis()))
}

/// Artifact URL over call URL over message-level URL.
fn recording_url_for(event: &LocatedEvent) -> Option<String> {
    [
        event.artifact.as_ref().and_then(|a| a.recording_url.as_deref()),
        event.call.as_ref().and_then(|c| c.recording_url.as_deref()),
        event.recording_url.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|u| !u.is_empty())
    .map(str::to_string)
}

/// Runs the end-of-call pipeline for a `Process` event.
///
/// A missing transcript or a failed evaluation degrades the result instead
/// of aborting, and a persistence failure after retries is reported in the
/// response body only. Errors returned here are unexpected ones.
pub async fn process_end_of_call(
    state: &AppState,
    event: &LocatedEvent,
) -> Result<ProcessedResponse, AppError> {
    let call_id = call_id_for(event);
    let student = StudentMetadata::from_event(event);
    info!(
        call_id = %call_id,
        student = %student.name,
        subject = %student.subject,
        "Processing end-of-call event"
    );

    let transcript = extract(
        event.call.as_ref(),
        event.artifact.as_ref(),
        event.transcript.as_deref(),
    );
    if transcript.is_empty() {
        warn!(call_id = %call_id, "No transcript in end-of-call event; storing metadata only");
    }

    let pairs = parse(&transcript);
    info!(call_id = %call_id, pairs = pairs.len(), "Parsed transcript");

    let evaluation = match state.evaluator.evaluate(&pairs, &student.subject).await {
        Ok(evaluation) => evaluation,
        Err(e) => {
            error!(call_id = %call_id, "Evaluation failed, storing zero marks: {e}");
            Evaluation::zeroed(
                &pairs,
                state.evaluator.max_marks_per_question() as f64,
                EVALUATION_FAILED_FEEDBACK,
            )
        }
    };

    let summary = CallSummary {
        call_id: call_id.clone(),
        student_name: student.name,
        student_email: student.email,
        subject: student.subject,
        topics: student.topics,
        transcript,
        recording_url: recording_url_for(event),
        duration_secs: event.call.as_ref().and_then(|c| c.duration_secs()),
    };
    let record = ResultRecord::new(&summary, &evaluation, Utc::now())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize evaluation: {e}")))?;

    let (sink, record) = (&state.sink, &record);
    let sync = retry_with_delay(
        state.config.persist_max_attempts,
        state.config.persist_retry_delay,
        |_attempt| sink.save(record),
        SinkError::is_retryable,
    )
    .await;

    match &sync {
        Ok(status) => info!(
            call_id = %call_id,
            duration_secs = summary.duration_secs,
            "Viva result {}",
            status.as_str()
        ),
        Err(e) => error!(call_id = %call_id, "Viva result NOT persisted: {e}"),
    }

    Ok(ProcessedResponse::new(call_id, &evaluation, &sync))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::locator::locate;
    use serde_json::json;

    #[test]
    fn test_assistant_request() {
        let event = locate(&json!({"message": {"type": "assistant-request", "call": {"id": "c"}}}));
        assert_eq!(classify(&event), WebhookAction::AssistantRequest);
    }

    #[test]
    fn test_intermediate_types_are_skipped_even_when_ended() {
        for message_type in ["status-update", "transcript", "speech-update", "hang"] {
            let event = locate(&json!({
                "message": {"type": message_type, "call": {"id": "c", "status": "ended"}}
            }));
            assert_eq!(
                classify(&event),
                WebhookAction::NonTerminal(Some(message_type.to_string()))
            );
        }
    }

    #[test]
    fn test_end_of_call_report_processes_regardless_of_status() {
        let event = locate(&json!({
            "message": {"type": "end-of-call-report", "call": {"id": "c", "status": "in-progress"}}
        }));
        assert_eq!(classify(&event), WebhookAction::Process);
    }

    #[test]
    fn test_end_of_call_report_without_call() {
        let event = locate(&json!({"message": {"type": "end-of-call-report"}}));
        assert_eq!(classify(&event), WebhookAction::NoCallData);
    }

    #[test]
    fn test_typeless_event_uses_call_status() {
        let ended = locate(&json!({"call": {"id": "c", "status": "completed"}}));
        assert_eq!(classify(&ended), WebhookAction::Process);

        let running = locate(&json!({"call": {"id": "c", "status": "in-progress"}}));
        assert_eq!(classify(&running), WebhookAction::NonTerminal(None));

        assert_eq!(classify(&locate(&json!({}))), WebhookAction::NoCallData);
    }

    #[test]
    fn test_call_id_fallback() {
        let event = locate(&json!({"call": {"status": "ended"}}));
        assert!(call_id_for(&event).starts_with("unknown-"));

        let event = locate(&json!({"call": {"id": "  "}}));
        assert!(call_id_for(&event).starts_with("unknown-"));

        let event = locate(&json!({"call": {"id": "abc"}}));
        assert_eq!(call_id_for(&event), "abc");
    }

    #[test]
    fn test_recording_url_priority() {
        let event = locate(&json!({
            "message": {
                "recordingUrl": "https://message",
                "call": {"recordingUrl": "https://call"},
                "artifact": {"recordingUrl": "https://artifact"}
            }
        }));
        assert_eq!(recording_url_for(&event).as_deref(), Some("https://artifact"));

        let event = locate(&json!({
            "message": {"recordingUrl": "https://message", "call": {"id": "c"}}
        }));
        assert_eq!(recording_url_for(&event).as_deref(), Some("https://message"));
    }
}
