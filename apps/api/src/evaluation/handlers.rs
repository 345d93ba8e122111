//! Axum route handler for ad-hoc evaluation (no persistence).

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::evaluation::{Evaluation, QuestionAnswerPair};
use crate::state::AppState;
use crate::transcript::parser::parse;
use crate::webhook::metadata::DEFAULT_SUBJECT;

#[derive(Debug, Deserialize)]
pub struct PairInput {
    pub question: String,
    pub answer: String,
}

/// Either a normalized transcript or pre-split pairs.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub pairs: Option<Vec<PairInput>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub pairs: Vec<QuestionAnswerPair>,
    pub evaluation: Evaluation,
    pub scorer_backend: &'static str,
}

/// POST /api/v1/evaluations
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let pairs = request_pairs(&request)?;
    let subject = request
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUBJECT);

    let evaluation = state.evaluator.evaluate(&pairs, subject).await?;

    Ok(Json(EvaluateResponse {
        pairs,
        evaluation,
        scorer_backend: state.evaluator.backend(),
    }))
}

fn request_pairs(request: &EvaluateRequest) -> Result<Vec<QuestionAnswerPair>, AppError> {
    match (&request.pairs, &request.transcript) {
        (Some(pairs), _) => {
            if pairs.iter().any(|p| p.question.trim().is_empty()) {
                return Err(AppError::Validation(
                    "every pair needs a non-empty question".to_string(),
                ));
            }
            Ok(pairs
                .iter()
                .enumerate()
                .map(|(i, p)| QuestionAnswerPair {
                    question_number: i as u32 + 1,
                    question: p.question.trim().to_string(),
                    answer: p.answer.trim().to_string(),
                })
                .collect())
        }
        (None, Some(transcript)) => Ok(parse(transcript)),
        (None, None) => Err(AppError::Validation(
            "either transcript or pairs is required".to_string(),
        )),
    }
}
