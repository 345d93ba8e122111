use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::evaluation::Evaluation;

/// Upper bound on the transcript text stored with a result.
pub const MAX_STORED_TRANSCRIPT_CHARS: usize = 50_000;

/// Display format of the `timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// One persisted viva result, keyed by `call_id`.
///
/// Column order after `call_id` is fixed: timestamp, student name, student
/// email, subject, topics, questions answered, score, overall feedback,
/// transcript, recording URL, evaluation JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ResultRecord {
    pub id: Uuid,
    pub call_id: String,
    pub timestamp: String,
    pub student_name: String,
    pub student_email: String,
    pub subject: String,
    pub topics: String,
    pub questions_answered: i32,
    pub score: String,
    pub overall_feedback: String,
    pub transcript: String,
    pub recording_url: String,
    pub evaluation: String,
}

/// Everything the webhook knows about a finished call, before it is laid out
/// as a record.
#[derive(Debug, Clone)]
pub struct CallSummary {
    pub call_id: String,
    pub student_name: String,
    pub student_email: String,
    pub subject: String,
    pub topics: String,
    pub transcript: String,
    pub recording_url: Option<String>,
    pub duration_secs: Option<u64>,
}

impl ResultRecord {
    pub fn new(
        summary: &CallSummary,
        evaluation: &Evaluation,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            call_id: summary.call_id.clone(),
            timestamp: recorded_at.format(TIMESTAMP_FORMAT).to_string(),
            student_name: summary.student_name.clone(),
            student_email: summary.student_email.clone(),
            subject: summary.subject.clone(),
            topics: summary.topics.clone(),
            questions_answered: i32::try_from(evaluation.questions_answered()).unwrap_or(i32::MAX),
            score: format!("{}/100", evaluation.percentage.round() as i64),
            overall_feedback: evaluation.overall_feedback.clone(),
            transcript: truncate_chars(&summary.transcript, MAX_STORED_TRANSCRIPT_CHARS),
            recording_url: summary.recording_url.clone().unwrap_or_default(),
            evaluation: serde_json::to_string(evaluation)?,
        })
    }

    /// Enforces the stored transcript bound on a record built elsewhere.
    pub fn truncate_transcript(&mut self) {
        if self.transcript.chars().count() > MAX_STORED_TRANSCRIPT_CHARS {
            self.transcript = truncate_chars(&self.transcript, MAX_STORED_TRANSCRIPT_CHARS);
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
