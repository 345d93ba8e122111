//! Evaluator: scores Q&A pairs and assembles the `Evaluation`.
//!
//! The primary scorer (LLM when configured) is tried first; any error from it
//! discards its output entirely and the fallback scorer marks every pair.
//! Totals and percentage are always recomputed here from the applied marks.

use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::AppError;
use crate::evaluation::scorer::{overall_feedback_for, HeuristicScorer, QaScorer, ScoreSheet};
use crate::models::evaluation::{
    percentage, Evaluation, QuestionAnswerPair, QuestionFeedback, QuestionMark,
};

pub const NO_QUESTIONS_FEEDBACK: &str = "No questions answered.";
const MISSING_QUESTION_FEEDBACK: &str = "No evaluation was returned for this question.";

#[derive(Clone)]
pub struct Evaluator {
    primary: Option<Arc<dyn QaScorer>>,
    fallback: Arc<dyn QaScorer>,
    max_marks_per_question: u32,
}

impl Evaluator {
    pub fn new(primary: Option<Arc<dyn QaScorer>>, max_marks_per_question: u32) -> Self {
        Self {
            primary,
            fallback: Arc::new(HeuristicScorer),
            max_marks_per_question,
        }
    }

    /// Replaces the fallback scorer (the heuristic by default).
    pub fn with_fallback(mut self, fallback: Arc<dyn QaScorer>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn max_marks_per_question(&self) -> u32 {
        self.max_marks_per_question
    }

    pub fn backend(&self) -> &'static str {
        self.primary
            .as_ref()
            .map(|p| p.backend())
            .unwrap_or_else(|| self.fallback.backend())
    }

    pub async fn evaluate(
        &self,
        pairs: &[QuestionAnswerPair],
        subject: &str,
    ) -> Result<Evaluation, AppError> {
        if pairs.is_empty() {
            return Ok(Evaluation::empty(NO_QUESTIONS_FEEDBACK));
        }

        let max_marks = self.max_marks_per_question;
        let sheet = match &self.primary {
            Some(primary) => match primary.score(pairs, subject, max_marks).await {
                Ok(sheet) => sheet,
                Err(e) => {
                    warn!(
                        backend = primary.backend(),
                        "Primary scorer failed, using {}: {e}",
                        self.fallback.backend()
                    );
                    self.fallback.score(pairs, subject, max_marks).await?
                }
            },
            None => self.fallback.score(pairs, subject, max_marks).await?,
        };

        let evaluation = assemble(pairs, sheet, max_marks as f64, subject);
        info!(
            questions = pairs.len(),
            total = evaluation.total_marks,
            max = evaluation.max_total_marks,
            "Evaluated viva: {}%",
            evaluation.percentage
        );
        Ok(evaluation)
    }
}

/// Lines the sheet up with the pairs by `questionNumber`.
///
/// A pair the sheet does not mention scores zero with generic feedback. Marks
/// reported on a different scale are rescaled, then clamped into range.
pub fn assemble(
    pairs: &[QuestionAnswerPair],
    sheet: ScoreSheet,
    max_marks: f64,
    subject: &str,
) -> Evaluation {
    let mut marks = Vec::with_capacity(pairs.len());
    let mut feedback = Vec::with_capacity(pairs.len());

    for pair in pairs {
        let scored = sheet
            .evaluations
            .iter()
            .find(|s| s.question_number == pair.question_number);

        let (applied, row) = match scored {
            Some(s) => (
                normalize_marks(s.marks, s.max_marks, max_marks),
                QuestionFeedback {
                    question_number: pair.question_number,
                    feedback: s.feedback.clone(),
                    strengths: s.strengths.clone(),
                    weaknesses: s.weaknesses.clone(),
                },
            ),
            None => {
                warn!(
                    question_number = pair.question_number,
                    "Scorer omitted a question, scoring it zero"
                );
                (
                    0.0,
                    QuestionFeedback {
                        question_number: pair.question_number,
                        feedback: MISSING_QUESTION_FEEDBACK.to_string(),
                        strengths: Vec::new(),
                        weaknesses: Vec::new(),
                    },
                )
            }
        };

        marks.push(QuestionMark {
            question_number: pair.question_number,
            question: pair.question.clone(),
            answer: pair.answer.clone(),
            marks: applied,
            max_marks,
        });
        feedback.push(row);
    }

    let max_total = pairs.len() as f64 * max_marks;
    let overall = if sheet.overall_feedback.trim().is_empty() {
        let total: f64 = marks.iter().map(|m| m.marks).sum();
        overall_feedback_for(percentage(total, max_total), subject)
    } else {
        sheet.overall_feedback
    };

    Evaluation::from_rows(marks, feedback, max_total, overall)
}

fn normalize_marks(marks: f64, reported_max: Option<f64>, max_marks: f64) -> f64 {
    if !marks.is_finite() {
        return 0.0;
    }
    let scaled = match reported_max {
        Some(reported) if reported.is_finite() && reported > 0.0 && reported != max_marks => {
            marks * max_marks / reported
        }
        _ => marks,
    };
    scaled.clamp(0.0, max_marks)
}
