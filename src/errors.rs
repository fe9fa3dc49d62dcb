// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::assignment::AssignmentError;
use crate::store::StoreError;

pub const CONTACT_ADMIN: &str = "Something went wrong. Please contact the admin with your payment reference.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("Invalid ObjectId: {0}")]
    InvalidObjectId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Sold out: {0}")]
    SoldOut(String),

    #[error("Authentication error")]
    AuthError,

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, "Conflict"),
            AppError::Store(StoreError::Unexpected(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AppError::Multipart(_) => (StatusCode::BAD_REQUEST, "Invalid multipart data"),
            AppError::InvalidObjectId(_) => (StatusCode::BAD_REQUEST, "Invalid ID format"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            AppError::SoldOut(_) => (StatusCode::CONFLICT, "Sold out"),
            AppError::AuthError => (StatusCode::UNAUTHORIZED, "Authentication failed"),
            AppError::Unauthorized => (StatusCode::FORBIDDEN, "Unauthorized access"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "Validation failed"),
            AppError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable")
            }
            AppError::ExternalApi(_) => (StatusCode::BAD_GATEWAY, "External API error"),
            AppError::ConfigurationError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error")
            }
            AppError::ServiceError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Service error"),
        };

        // Server-side detail stays in the logs.
        let message = if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!("{}", self);
            CONTACT_ADMIN.to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": error_message,
            "message": message,
            "success": false,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::Multipart(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(format!("HTTP request failed: {}", err))
    }
}

impl From<mongodb::bson::oid::Error> for AppError {
    fn from(err: mongodb::bson::oid::Error) -> Self {
        AppError::InvalidObjectId(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<AssignmentError> for AppError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::InvalidInput(msg) => AppError::ValidationError(msg),
            AssignmentError::UnknownPackage(id) => AppError::NotFound(format!("package {id}")),
            AssignmentError::OutOfStock { package_id } => AppError::SoldOut(package_id),
            AssignmentError::Store(e) => AppError::Store(e),
            other => AppError::ServiceError(other.to_string()),
        }
    }
}

// Helper conversion functions
impl AppError {
    pub fn external_api(msg: impl Into<String>) -> Self {
        AppError::ExternalApi(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        AppError::ServiceError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_failures_hide_detail() {
        let err = AppError::Store(StoreError::Unexpected(anyhow::anyhow!("connection reset by 10.0.0.7")));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert!(!String::from_utf8_lossy(&bytes).contains("10.0.0.7"));
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["message"], CONTACT_ADMIN);
        assert_eq!(body["success"], false);
    }

    #[test]
    fn out_of_stock_maps_to_conflict() {
        let err: AppError = AssignmentError::OutOfStock {
            package_id: "gold-3w".into(),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
