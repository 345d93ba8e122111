// LLM prompt constants for viva scoring.
// Reuses the JSON-only fragment from llm_client::prompts.

/// System prompt for transcript scoring. Append `JSON_ONLY_SYSTEM`.
pub const SCORING_SYSTEM: &str = "You are a fair, experienced university examiner \
    marking the transcript of an oral examination (viva). \
    Judge only what the student actually said.";

/// Scoring prompt template.
/// Replace: {subject}, {max_marks}, {pairs_json}
pub const SCORING_PROMPT_TEMPLATE: &str = r#"Evaluate the student's answers from a viva on the subject "{subject}".

QUESTIONS AND ANSWERS (JSON):
{pairs_json}

MARKING SCHEME (per question, 0 to {max_marks} marks):
- 0: no answer, or the answer is incorrect
- about one third of the marks: partially correct, key ideas missing
- about two thirds of the marks: correct with minor gaps
- {max_marks}: excellent, complete and accurate
On a 0-3 scale this is exactly 0 / 1 / 2 / 3.
An answer such as "I don't know" or "not sure" earns at most one third of the marks.

Return a JSON object with this EXACT schema (no extra fields):
{
  "evaluations": [
    {
      "questionNumber": 1,
      "marks": 2,
      "maxMarks": {max_marks},
      "feedback": "One or two sentences addressed to the student.",
      "strengths": ["What the answer got right"],
      "weaknesses": ["What was missing or wrong"]
    }
  ],
  "overallFeedback": "Two or three sentences summarising the viva."
}

HARD RULES:
1. Return exactly one entry per question, using the questionNumber given above
2. `marks` must be between 0 and {max_marks}
3. Do NOT reward confident delivery; mark content only"#;
