//! Scorer backends: pluggable, trait-based marking of Q&A pairs.
//!
//! `LlmScorer` (Anthropic, used when an API key is configured) and
//! `HeuristicScorer` (pure Rust, deterministic, always available) both produce
//! a `ScoreSheet`; the evaluator turns it into an `Evaluation`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::evaluation::prompts::{SCORING_PROMPT_TEMPLATE, SCORING_SYSTEM};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::LlmClient;
use crate::models::evaluation::{percentage, QuestionAnswerPair};

// ────────────────────────────────────────────────────────────────────────────
// Scorer output (the LLM's strict JSON contract)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredQuestion {
    pub question_number: u32,
    pub marks: f64,
    #[serde(default)]
    pub max_marks: Option<f64>,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSheet {
    pub evaluations: Vec<ScoredQuestion>,
    pub overall_feedback: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Implement this to swap scoring backends without touching the evaluator
/// or the webhook.
#[async_trait]
pub trait QaScorer: Send + Sync {
    /// Short backend name for logs: "llm" | "heuristic".
    fn backend(&self) -> &'static str;

    async fn score(
        &self,
        pairs: &[QuestionAnswerPair],
        subject: &str,
        max_marks: u32,
    ) -> Result<ScoreSheet, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmScorer
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmScorer(pub LlmClient);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptPair<'a> {
    question_number: u32,
    question: &'a str,
    answer: &'a str,
}

#[async_trait]
impl QaScorer for LlmScorer {
    fn backend(&self) -> &'static str {
        "llm"
    }

    async fn score(
        &self,
        pairs: &[QuestionAnswerPair],
        subject: &str,
        max_marks: u32,
    ) -> Result<ScoreSheet, AppError> {
        let prompt = build_scoring_prompt(pairs, subject, max_marks)?;
        let system = format!("{SCORING_SYSTEM} {JSON_ONLY_SYSTEM}");
        self.0
            .call_json::<ScoreSheet>(&prompt, &system)
            .await
            .map_err(|e| AppError::Llm(format!("Viva scoring failed: {e}")))
    }
}

pub fn build_scoring_prompt(
    pairs: &[QuestionAnswerPair],
    subject: &str,
    max_marks: u32,
) -> Result<String, AppError> {
    let pairs_json = serde_json::to_string_pretty(
        &pairs
            .iter()
            .map(|p| PromptPair {
                question_number: p.question_number,
                question: &p.question,
                answer: &p.answer,
            })
            .collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize Q&A pairs: {e}")))?;

    Ok(SCORING_PROMPT_TEMPLATE
        .replace("{subject}", subject)
        .replace("{max_marks}", &max_marks.to_string())
        .replace("{pairs_json}", &pairs_json))
}

// ────────────────────────────────────────────────────────────────────────────
// HeuristicScorer
// ────────────────────────────────────────────────────────────────────────────

/// Answer-length scorer. No network, no randomness.
///
/// On the 0–3 scale: empty → 0, under 50 chars → 1, under 150 → 2, else 3,
/// capped at 1 when the student says they don't know or aren't sure. Other
/// scales are the 0–3 band scaled proportionally.
pub struct HeuristicScorer;

const UNSURE_MARKERS: &[&str] = &["don't know", "not sure"];

/// Band on the 0–3 scale.
pub fn length_band(answer: &str) -> u32 {
    let answer = answer.trim();
    let len = answer.chars().count();
    let band = match len {
        0 => 0,
        1..=49 => 1,
        50..=149 => 2,
        _ => 3,
    };

    let lower = answer.to_lowercase();
    if UNSURE_MARKERS.iter().any(|m| lower.contains(m)) {
        band.min(1)
    } else {
        band
    }
}

pub fn heuristic_marks(answer: &str, max_marks: u32) -> f64 {
    let band = length_band(answer);
    if max_marks == 3 {
        return band as f64;
    }
    (band as f64 * max_marks as f64 / 3.0).round()
}

fn band_feedback(band: u32, unsure: bool) -> &'static str {
    if unsure {
        return "The student was unsure here; revisit this topic.";
    }
    match band {
        0 => "No answer was given.",
        1 => "Brief answer; more explanation was needed.",
        2 => "Reasonable answer with some gaps.",
        _ => "Detailed answer.",
    }
}

/// Overall feedback band for a percentage.
pub fn overall_feedback_for(percentage: f64, subject: &str) -> String {
    if percentage >= 80.0 {
        format!("Excellent performance. The student shows a strong understanding of {subject}.")
    } else if percentage >= 60.0 {
        format!("Good performance. The student understands the core concepts of {subject}, with some room to deepen them.")
    } else if percentage >= 40.0 {
        format!("Fair performance. The student has a partial grasp of {subject} and should review the weaker areas.")
    } else {
        format!("Needs improvement. The student should revisit the fundamentals of {subject}.")
    }
}

impl HeuristicScorer {
    pub fn sheet(pairs: &[QuestionAnswerPair], subject: &str, max_marks: u32) -> ScoreSheet {
        let evaluations: Vec<ScoredQuestion> = pairs
            .iter()
            .map(|p| {
                let band = length_band(&p.answer);
                let lower = p.answer.to_lowercase();
                let unsure = UNSURE_MARKERS.iter().any(|m| lower.contains(m));
                ScoredQuestion {
                    question_number: p.question_number,
                    marks: heuristic_marks(&p.answer, max_marks),
                    max_marks: Some(max_marks as f64),
                    feedback: band_feedback(band, unsure).to_string(),
                    strengths: Vec::new(),
                    weaknesses: Vec::new(),
                }
            })
            .collect();

        let total: f64 = evaluations.iter().map(|e| e.marks).sum();
        let pct = percentage(total, pairs.len() as f64 * max_marks as f64);

        ScoreSheet {
            evaluations,
            overall_feedback: overall_feedback_for(pct, subject),
        }
    }
}

#[async_trait]
impl QaScorer for HeuristicScorer {
    fn backend(&self) -> &'static str {
        "heuristic"
    }

    async fn score(
        &self,
        pairs: &[QuestionAnswerPair],
        subject: &str,
        max_marks: u32,
    ) -> Result<ScoreSheet, AppError> {
        Ok(Self::sheet(pairs, subject, max_marks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::parse_json_reply;

    fn pair(n: u32, answer: &str) -> QuestionAnswerPair {
        QuestionAnswerPair {
            question_number: n,
            question: format!("Question {n}?"),
            answer: answer.to_string(),
        }
    }

    #[test]
    fn test_length_bands() {
        assert_eq!(length_band(""), 0);
        assert_eq!(length_band(&"a".repeat(40)), 1);
        assert_eq!(length_band(&"a".repeat(49)), 1);
        assert_eq!(length_band(&"a".repeat(50)), 2);
        assert_eq!(length_band(&"a".repeat(120)), 2);
        assert_eq!(length_band(&"a".repeat(150)), 3);
        assert_eq!(length_band(&"a".repeat(300)), 3);
    }

    #[test]
    fn test_unsure_answers_are_capped() {
        let long_unsure = format!("I am not sure but {}", "b".repeat(290));
        assert_eq!(long_unsure.chars().count(), 308);
        assert!(length_band(&long_unsure) <= 1);

        let dont_know = format!("I DON'T KNOW {}", "c".repeat(200));
        assert_eq!(length_band(&dont_know), 1);
    }

    #[test]
    fn test_heuristic_marks_scale() {
        let long = "a".repeat(300);
        assert_eq!(heuristic_marks(&long, 3), 3.0);
        assert_eq!(heuristic_marks(&long, 10), 10.0);
        assert_eq!(heuristic_marks(&"a".repeat(40), 10), 3.0);
        assert_eq!(heuristic_marks(&"a".repeat(120), 10), 7.0);
        assert_eq!(heuristic_marks("", 10), 0.0);
    }

    #[test]
    fn test_overall_feedback_bands() {
        assert!(overall_feedback_for(80.0, "Maths").starts_with("Excellent"));
        assert!(overall_feedback_for(60.0, "Maths").starts_with("Good"));
        assert!(overall_feedback_for(40.0, "Maths").starts_with("Fair"));
        assert!(overall_feedback_for(39.99, "Maths").starts_with("Needs improvement"));
    }

    #[test]
    fn test_heuristic_sheet() {
        let sheet = HeuristicScorer::sheet(
            &[pair(1, &"x".repeat(300)), pair(2, ""), pair(3, "Short one")],
            "Networks",
            3,
        );
        let marks: Vec<f64> = sheet.evaluations.iter().map(|e| e.marks).collect();
        assert_eq!(marks, vec![3.0, 0.0, 1.0]);
        // 4 / 9 = 44.44%
        assert!(sheet.overall_feedback.starts_with("Fair"));
        assert!(sheet.overall_feedback.contains("Networks"));
    }

    #[test]
    fn test_scoring_prompt_contains_pairs_and_scale() {
        let prompt = build_scoring_prompt(&[pair(1, "A stack is LIFO")], "DSA", 10).unwrap();
        assert!(prompt.contains("\"DSA\""));
        assert!(prompt.contains("A stack is LIFO"));
        assert!(prompt.contains("\"questionNumber\": 1"));
        assert!(prompt.contains("0 to 10 marks"));
        assert!(!prompt.contains("{max_marks}"));
    }

    #[test]
    fn test_score_sheet_contract() {
        let sheet: ScoreSheet = parse_json_reply(
            r#"```json
            {
              "evaluations": [
                {"questionNumber": 1, "marks": 2, "maxMarks": 3, "feedback": "Good",
                 "strengths": ["clear"], "weaknesses": []}
              ],
              "overallFeedback": "Solid."
            }
            ```"#,
        )
        .unwrap();
        assert_eq!(sheet.evaluations[0].marks, 2.0);
        assert_eq!(sheet.evaluations[0].strengths, vec!["clear"]);
        assert_eq!(sheet.overall_feedback, "Solid.");
    }

    #[test]
    fn test_score_sheet_missing_fields_is_rejected() {
        let result: Result<ScoreSheet, _> =
            parse_json_reply(r#"{"evaluations": [{"questionNumber": 1}], "overallFeedback": ""}"#);
        assert!(result.is_err());

        let result: Result<ScoreSheet, _> = parse_json_reply(r#"{"evaluations": []}"#);
        assert!(result.is_err());
    }
}
