pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers::handle_evaluate;
use crate::results::handlers::handle_get_result;
use crate::state::AppState;
use crate::webhook::handlers::handle_call_webhook;

/// End-of-call reports repeat the conversation in several shapes (messages,
/// model-formatted messages, flat transcript), so long vivas exceed axum's
/// 2 MB default.
pub const WEBHOOK_BODY_LIMIT: usize = 32 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Call platform webhook; /webhook is the path configured on the platform side
        .route(
            "/webhook",
            post(handle_call_webhook).layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT)),
        )
        .route(
            "/api/v1/webhooks/call",
            post(handle_call_webhook).layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT)),
        )
        .route("/api/v1/evaluations", post(handle_evaluate))
        .route("/api/v1/results/:call_id", get(handle_get_result))
        .with_state(state)
}
