use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::transcript::locator::locate;
use crate::webhook::controller::{classify, process_end_of_call, WebhookAction};
use crate::webhook::signature::{verify_signature, SIGNATURE_HEADER};

/// POST /api/v1/webhooks/call (also mounted at /webhook)
///
/// The body is taken raw so the signature is computed over the exact bytes
/// the platform sent.
pub async fn handle_call_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let provided = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if !verify_signature(secret, &body, provided) {
            warn!(
                has_header = provided.is_some(),
                "Rejected webhook with invalid signature"
            );
            return Err(AppError::Unauthorized);
        }
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Webhook body is not JSON: {e}")))?;

    let event = locate(&payload);
    let response = match classify(&event) {
        WebhookAction::AssistantRequest => {
            debug!("Answering assistant-request with empty configuration");
            json!({})
        }
        WebhookAction::NonTerminal(message_type) => {
            debug!(message_type = message_type.as_deref(), "Skipping intermediate event");
            json!({"received": true, "type": message_type, "skipped": true})
        }
        WebhookAction::NoCallData => {
            warn!(
                message_type = event.kind.as_str(),
                "Terminal event carried no call data"
            );
            json!({"received": true, "skipped": true, "reason": "no call data"})
        }
        WebhookAction::Process => {
            let outcome = process_end_of_call(&state, &event).await?;
            info!(
                call_id = %outcome.call_id,
                sync_status = outcome.sync_status,
                "Webhook processed"
            );
            serde_json::to_value(outcome).map_err(|e| AppError::Internal(e.into()))?
        }
    };

    Ok(Json(response))
}
