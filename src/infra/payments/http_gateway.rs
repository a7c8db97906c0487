use crate::domain::models::payment::PaymentIntent;
use crate::domain::ports::PaymentGateway;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::error;

/// REST adapter to the card payment provider. Mutating calls carry an
/// Idempotency-Key header; the provider guarantees at-most-once effects
/// per key, which is what makes orchestrator retries safe.
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: String, api_key: String, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_millis(if timeout_ms > 0 { timeout_ms } else { 15_000 }))
            .build()
            .expect("Failed to build payment gateway HTTP client");

        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn parse_intent(&self, res: reqwest::Response) -> Result<PaymentIntent, AppError> {
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            let msg = format!("Payment provider returned {}: {}", status, body);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }
        res.json::<PaymentIntent>()
            .await
            .map_err(|e| AppError::InternalWithMsg(format!("Malformed provider response: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, AppError> {
        let res = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", idempotency_key)
            .json(&json!({ "amount": amount_minor, "currency": currency }))
            .send()
            .await
            .map_err(|e| AppError::InternalWithMsg(format!("Intent creation failed: {}", e)))?;

        self.parse_intent(res).await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, AppError> {
        let res = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.base_url, intent_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                // A timed-out verification is "unknown", not a failure:
                // the hold stays alive and the caller retries.
                if e.is_timeout() {
                    AppError::PaymentVerificationTimeout
                } else {
                    AppError::InternalWithMsg(format!("Intent retrieval failed: {}", e))
                }
            })?;

        self.parse_intent(res).await
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<(), AppError> {
        let res = self
            .client
            .post(format!("{}/v1/payment_intents/{}/cancel", self.base_url, intent_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::InternalWithMsg(format!("Intent cancel failed: {}", e)))?;

        if !res.status().is_success() {
            let msg = format!("Intent cancel returned {}", res.status());
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }
        Ok(())
    }

    async fn refund(&self, intent_id: &str, amount_minor: i64) -> Result<(), AppError> {
        let res = self
            .client
            .post(format!("{}/v1/refunds", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", format!("refund-{}", intent_id))
            .json(&json!({ "payment_intent": intent_id, "amount": amount_minor }))
            .send()
            .await
            .map_err(|e| AppError::InternalWithMsg(format!("Refund failed: {}", e)))?;

        if !res.status().is_success() {
            let msg = format!("Refund returned {}", res.status());
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }
        Ok(())
    }

    async fn charge_saved_method(
        &self,
        amount_minor: i64,
        currency: &str,
        method_ref: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, AppError> {
        let res = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", idempotency_key)
            .json(&json!({
                "amount": amount_minor,
                "currency": currency,
                "payment_method": method_ref,
                "confirm": true,
                "off_session": true
            }))
            .send()
            .await
            .map_err(|e| AppError::InternalWithMsg(format!("Off-session charge failed: {}", e)))?;

        self.parse_intent(res).await
    }
}
