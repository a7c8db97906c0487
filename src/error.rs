use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Slot is no longer available")]
    SlotUnavailable,
    #[error("Hold has expired")]
    HoldExpired,
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
    #[error("Payment not completed yet")]
    PaymentPending,
    #[error("Payment verification timed out")]
    PaymentVerificationTimeout,
    #[error("Webhook signature verification failed")]
    WebhookSignatureInvalid,
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return (
                            StatusCode::CONFLICT,
                            Json(json!({ "error": "Resource already exists (duplicate entry)" })),
                        )
                            .into_response();
                    }
                }

                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::SlotUnavailable => (
                StatusCode::CONFLICT,
                "Slot is no longer available, pick another slot".to_string(),
            ),
            AppError::HoldExpired => (
                StatusCode::GONE,
                "Hold has expired, start a new reservation".to_string(),
            ),
            AppError::PaymentFailed(msg) => (StatusCode::PAYMENT_REQUIRED, msg.clone()),
            AppError::PaymentPending => (
                StatusCode::CONFLICT,
                "Payment has not completed yet, retry confirmation".to_string(),
            ),
            AppError::PaymentVerificationTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Payment verification timed out, retry confirmation".to_string(),
            ),
            AppError::WebhookSignatureInvalid => {
                warn!("security: webhook signature verification failed");
                (StatusCode::BAD_REQUEST, "Invalid signature".to_string())
            }
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
