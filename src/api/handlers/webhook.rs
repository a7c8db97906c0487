use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::state::AppState;

/// Provider webhook intake. 2xx acks the delivery; a 4xx is a permanent
/// reject (bad signature, malformed body) the provider should not
/// retry with the same payload; any 5xx triggers provider-side
/// redelivery.
pub async fn payments_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get("payment-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::WebhookSignatureInvalid)?;

    state.reconciler.handle(&body, signature).await?;

    Ok(Json(json!({ "received": true })))
}
