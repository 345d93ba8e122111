use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status and which optional collaborators are configured.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "viva-api",
        "llmConfigured": state.config.anthropic_api_key.is_some(),
        "storeConfigured": state.sink.is_configured(),
        "mirrorConfigured": state.sink.has_mirror(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::evaluation::evaluator::Evaluator;
    use crate::results::sink::ResultSink;
    use crate::routes::build_router;
    use crate::state::AppState;

    #[tokio::test]
    async fn test_health_reports_unconfigured_collaborators() {
        let app = build_router(AppState {
            config: Config::for_tests(),
            evaluator: Evaluator::new(None, 3),
            sink: ResultSink::default(),
        });

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["llmConfigured"], false);
        assert_eq!(body["storeConfigured"], false);
    }
}
