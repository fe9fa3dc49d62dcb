use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::error;

use crate::dtos::storefront_dtos::SendSmsRequest;
use crate::state::AppState;

// POST /api/send-sms
pub async fn send_sms(
    State(state): State<AppState>,
    Json(payload): Json<SendSmsRequest>,
) -> (StatusCode, Json<Value>) {
    let recipient = payload.recipient.as_deref().map(str::trim).unwrap_or_default();
    let message = payload.message.as_deref().unwrap_or_default();
    if recipient.is_empty() || message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": false, "message": "recipient & message required" })),
        );
    }

    let Some(notifier) = state.notifications.notifier() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": false, "message": "SMS service is not configured" })),
        );
    };

    match notifier.send_sms(recipient, message).await {
        Ok(receipt) => (StatusCode::OK, Json(json!(receipt))),
        Err(e) => {
            error!("Send SMS error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": false, "message": "SMS delivery failed" })),
            )
        }
    }
}
