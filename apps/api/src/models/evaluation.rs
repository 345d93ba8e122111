use serde::{Deserialize, Serialize};

/// One extracted question paired with the student's accumulated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswerPair {
    pub question_number: u32,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMark {
    pub question_number: u32,
    pub question: String,
    pub answer: String,
    pub marks: f64,
    pub max_marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFeedback {
    pub question_number: u32,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

/// Scored result for a whole viva.
///
/// `marks` and `feedback` are parallel to the evaluated pairs, `total_marks`
/// is their sum and `percentage` is rounded to two decimals (0 when nothing
/// was evaluated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub marks: Vec<QuestionMark>,
    pub feedback: Vec<QuestionFeedback>,
    pub total_marks: f64,
    pub max_total_marks: f64,
    pub percentage: f64,
    pub overall_feedback: String,
}

impl Evaluation {
    /// Builds an evaluation from per-question rows, deriving the totals.
    pub fn from_rows(
        marks: Vec<QuestionMark>,
        feedback: Vec<QuestionFeedback>,
        max_total_marks: f64,
        overall_feedback: String,
    ) -> Self {
        let total_marks: f64 = marks.iter().map(|m| m.marks).sum();
        Self {
            percentage: percentage(total_marks, max_total_marks),
            marks,
            feedback,
            total_marks,
            max_total_marks,
            overall_feedback,
        }
    }

    /// Zero-score evaluation with no rows.
    pub fn empty(overall_feedback: &str) -> Self {
        Self::from_rows(Vec::new(), Vec::new(), 0.0, overall_feedback.to_string())
    }

    /// One zero-mark row per pair. Used when scoring failed outright so the
    /// transcript is still archived with its questions.
    pub fn zeroed(pairs: &[QuestionAnswerPair], max_marks: f64, overall_feedback: &str) -> Self {
        let marks = pairs
            .iter()
            .map(|p| QuestionMark {
                question_number: p.question_number,
                question: p.question.clone(),
                answer: p.answer.clone(),
                marks: 0.0,
                max_marks,
            })
            .collect();
        let feedback = pairs
            .iter()
            .map(|p| QuestionFeedback {
                question_number: p.question_number,
                feedback: overall_feedback.to_string(),
                strengths: Vec::new(),
                weaknesses: Vec::new(),
            })
            .collect();
        Self::from_rows(
            marks,
            feedback,
            pairs.len() as f64 * max_marks,
            overall_feedback.to_string(),
        )
    }

    pub fn questions_answered(&self) -> usize {
        self.marks.len()
    }
}

/// `round(100 * total / max, 2)`, or 0 when there is nothing to divide by.
pub fn percentage(total: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    round2(100.0 * total / max)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(n: u32) -> QuestionAnswerPair {
        QuestionAnswerPair {
            question_number: n,
            question: format!("Question {n}?"),
            answer: "An answer".to_string(),
        }
    }

    #[test]
    fn test_percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(2.0, 3.0), 66.67);
        assert_eq!(percentage(1.0, 3.0), 33.33);
        assert_eq!(percentage(3.0, 3.0), 100.0);
    }

    #[test]
    fn test_percentage_with_zero_max_is_zero() {
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert_eq!(percentage(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_empty_evaluation() {
        let eval = Evaluation::empty("No questions answered.");
        assert!(eval.marks.is_empty());
        assert_eq!(eval.total_marks, 0.0);
        assert_eq!(eval.max_total_marks, 0.0);
        assert_eq!(eval.percentage, 0.0);
        assert_eq!(eval.overall_feedback, "No questions answered.");
    }

    #[test]
    fn test_zeroed_keeps_one_row_per_pair() {
        let eval = Evaluation::zeroed(&[pair(1), pair(2)], 3.0, "Evaluation failed.");
        assert_eq!(eval.marks.len(), 2);
        assert_eq!(eval.feedback.len(), 2);
        assert_eq!(eval.total_marks, 0.0);
        assert_eq!(eval.max_total_marks, 6.0);
        assert_eq!(eval.percentage, 0.0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let eval = Evaluation::zeroed(&[pair(1)], 3.0, "x");
        let json = serde_json::to_value(&eval).unwrap();
        assert!(json.get("totalMarks").is_some());
        assert!(json.get("maxTotalMarks").is_some());
        assert!(json.get("overallFeedback").is_some());
        assert_eq!(json["marks"][0]["questionNumber"], 1);
        assert_eq!(json["marks"][0]["maxMarks"], 3.0);
    }
}
