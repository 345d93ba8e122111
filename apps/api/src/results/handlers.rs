use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::AppError;
use crate::models::result::ResultRecord;
use crate::state::AppState;

/// GET /api/v1/results/:call_id
pub async fn handle_get_result(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<ResultRecord>, AppError> {
    state
        .sink
        .find(&call_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No result for call {call_id}")))
}
