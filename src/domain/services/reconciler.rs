use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::domain::models::webhook_event::WebhookEvent;
use crate::domain::ports::WebhookEventRepository;
use crate::domain::services::reservation::ReservationService;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub mod event_types {
    pub const INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
    pub const INTENT_FAILED: &str = "payment_intent.payment_failed";
    pub const INTENT_CANCELED: &str = "payment_intent.canceled";
}

#[derive(Deserialize)]
struct WebhookPayload {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Deserialize)]
struct WebhookObject {
    id: String,
}

/// Resolves asynchronous provider events against in-flight reservations.
/// Delivery is at-least-once and unordered: events are deduplicated by
/// provider event id, and a failure arriving after the success for the
/// same intent is logged and dropped.
pub struct WebhookReconciler {
    secret: String,
    tolerance_secs: i64,
    webhook_repo: Arc<dyn WebhookEventRepository>,
    reservations: Arc<ReservationService>,
}

impl WebhookReconciler {
    pub fn new(
        secret: String,
        tolerance_secs: i64,
        webhook_repo: Arc<dyn WebhookEventRepository>,
        reservations: Arc<ReservationService>,
    ) -> Self {
        Self {
            secret,
            tolerance_secs,
            webhook_repo,
            reservations,
        }
    }

    /// Ack (Ok) once the event is durably reconciled or permanently
    /// irrelevant. A returned error means the provider should redeliver;
    /// a succeeded payment is never acked-then-dropped.
    pub async fn handle(&self, body: &[u8], signature_header: &str) -> Result<(), AppError> {
        self.verify_signature(body, signature_header, Utc::now())?;

        let payload: WebhookPayload = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {}", e)))?;

        if self.webhook_repo.seen(&payload.id).await? {
            info!("Webhook event {} already processed, acking", payload.id);
            return Ok(());
        }

        let intent_id = payload.data.object.id.clone();

        match payload.event_type.as_str() {
            event_types::INTENT_SUCCEEDED => {
                match self.reservations.finalize_by_intent(&intent_id).await {
                    Ok(booking) => {
                        info!(
                            "Webhook settled intent {} into booking {}",
                            intent_id, booking.booking_number
                        );
                    }
                    // Terminal outcomes: the event is resolved, ack it.
                    Err(AppError::HoldExpired) => {
                        info!("Webhook success for lapsed hold (intent {}), refund issued", intent_id);
                    }
                    Err(AppError::NotFound(msg)) => {
                        warn!("Webhook success for unknown intent {}: {}", intent_id, msg);
                    }
                    // Anything else (verification timeout, database trouble,
                    // intent not yet readable) gets a redelivery.
                    Err(e) => return Err(e),
                }
            }
            event_types::INTENT_FAILED | event_types::INTENT_CANCELED => {
                self.reservations.release_for_failed_payment(&intent_id).await?;
            }
            other => {
                debug!("Ignoring webhook event type {}", other);
            }
        }

        // Recorded only after successful reconciliation; a concurrent
        // delivery that raced us is absorbed by the unique event id.
        self.webhook_repo
            .record(&WebhookEvent::new(payload.id, payload.event_type, Some(intent_id)))
            .await?;

        Ok(())
    }

    fn verify_signature(&self, body: &[u8], header: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        verify_signature(&self.secret, self.tolerance_secs, body, header, now)
    }
}

/// Provider signature: `t=<unix>,v1=<hex hmac-sha256 of "t.body">`,
/// rejected outside the timestamp tolerance.
pub fn verify_signature(
    secret: &str,
    tolerance_secs: i64,
    body: &[u8],
    header: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<&str> = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(AppError::WebhookSignatureInvalid);
    };

    if (now.timestamp() - timestamp).abs() > tolerance_secs {
        return Err(AppError::WebhookSignatureInvalid);
    }

    let provided = hex::decode(signature).map_err(|_| AppError::WebhookSignatureInvalid)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AppError::Internal)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| AppError::WebhookSignatureInvalid)
}

/// Builds the signature header for a payload; the counterpart of
/// `verify_signature`, shared with the test harness.
pub fn signature_header(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const TOLERANCE: i64 = 300;

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"id":"evt_1"}"#;
        let now = Utc::now();
        let header = signature_header(SECRET, now.timestamp(), body);
        assert!(verify_signature(SECRET, TOLERANCE, body, &header, now).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let now = Utc::now();
        let header = signature_header(SECRET, now.timestamp(), br#"{"id":"evt_1"}"#);
        let result = verify_signature(SECRET, TOLERANCE, br#"{"id":"evt_2"}"#, &header, now);
        assert!(matches!(result, Err(AppError::WebhookSignatureInvalid)));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = br#"{"id":"evt_1"}"#;
        let now = Utc::now();
        let header = signature_header(SECRET, now.timestamp() - TOLERANCE - 1, body);
        let result = verify_signature(SECRET, TOLERANCE, body, &header, now);
        assert!(matches!(result, Err(AppError::WebhookSignatureInvalid)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = br#"{"id":"evt_1"}"#;
        let now = Utc::now();
        let header = signature_header("whsec_other", now.timestamp(), body);
        let result = verify_signature(SECRET, TOLERANCE, body, &header, now);
        assert!(matches!(result, Err(AppError::WebhookSignatureInvalid)));
    }
}
