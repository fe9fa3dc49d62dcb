use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::error;

use crate::state::AppState;

pub async fn root() -> &'static str {
    "WiFi Bank API is running"
}

// GET /health, /api/health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let backend = state.store.backend_name();
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "store": backend,
                "durable": state.store.is_durable(),
                "sms": state.notifications.is_enabled(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "store": backend,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}
