use std::cmp::max;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::domain::models::payment::intent_status;
use crate::domain::models::subscription::{
    retry_delay_days, subscription_status, NewSubscriptionParams, PaymentMethod, Subscription,
};
use crate::domain::ports::{PaymentGateway, SubscriptionRepository};
use crate::error::AppError;

const BILLING_BATCH: i32 = 50;

/// Recurring-billing state machine: ACTIVE -> PAST_DUE -> CANCELED, with
/// an explicit ACTIVE -> CANCELED path gated by a server-side
/// confirmation phrase. Reuses the payment gateway for off-session
/// charges; one billing attempt per (period, retry) idempotency key.
pub struct BillingService {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl BillingService {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            subscription_repo,
            gateway,
        }
    }

    pub async fn subscribe(&self, params: NewSubscriptionParams) -> Result<Subscription, AppError> {
        if params.amount_minor <= 0 {
            return Err(AppError::Validation("Plan amount must be positive".into()));
        }
        if params.period_days <= 0 {
            return Err(AppError::Validation("Billing period must be positive".into()));
        }

        let methods = self
            .subscription_repo
            .list_payment_methods(&params.principal_id)
            .await?;
        if !methods.iter().any(|m| m.method_ref == params.payment_method_ref) {
            return Err(AppError::Validation("Unknown payment method".into()));
        }

        let subscription = Subscription::new(params);
        let created = self.subscription_repo.create(&subscription).await?;
        info!("Subscription created: {} plan {}", created.id, created.plan_code);
        Ok(created)
    }

    /// One sweep pass: charge every subscription whose period ended or
    /// whose dunning retry is due. Per-subscription failures are logged
    /// and do not abort the batch.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<u32, AppError> {
        let due = self.subscription_repo.find_due(now, BILLING_BATCH).await?;
        let mut processed = 0;

        for subscription in due {
            match self.bill(subscription, now).await {
                Ok(_) => processed += 1,
                Err(e) => error!("Billing attempt failed: {:?}", e),
            }
        }

        Ok(processed)
    }

    async fn bill(&self, mut subscription: Subscription, now: DateTime<Utc>) -> Result<(), AppError> {
        let intent = self
            .gateway
            .charge_saved_method(
                subscription.amount_minor,
                &subscription.currency,
                &subscription.payment_method_ref,
                &subscription.billing_key(),
            )
            .await?;

        match intent.status.as_str() {
            intent_status::SUCCEEDED => {
                // Extend from the later of period end and now, so a
                // recovered PAST_DUE subscription gets a full period
                // instead of an instantly-due one.
                let base = max(subscription.current_period_end, now);
                subscription.current_period_end = base + Duration::days(subscription.period_days as i64);
                subscription.status = subscription_status::ACTIVE.to_string();
                subscription.retry_count = 0;
                subscription.next_retry_at = None;
                info!(
                    "Subscription {} billed, period extended to {}",
                    subscription.id, subscription.current_period_end
                );
            }
            intent_status::FAILED | intent_status::CANCELED => {
                subscription.retry_count += 1;
                match retry_delay_days(subscription.retry_count) {
                    Some(delay) => {
                        subscription.status = subscription_status::PAST_DUE.to_string();
                        subscription.next_retry_at = Some(now + Duration::days(delay));
                        warn!(
                            "Subscription {} charge failed (attempt {}), retrying in {}d",
                            subscription.id, subscription.retry_count, delay
                        );
                    }
                    None => {
                        subscription.status = subscription_status::CANCELED.to_string();
                        subscription.next_retry_at = None;
                        warn!(
                            "Subscription {} canceled after {} failed attempts",
                            subscription.id, subscription.retry_count
                        );
                    }
                }
            }
            _ => {
                // Charge still settling at the provider; look again on the
                // next sweep without burning a dunning attempt.
                subscription.next_retry_at = Some(now + Duration::hours(1));
            }
        }

        self.subscription_repo.update(&subscription).await?;
        Ok(())
    }

    /// Explicit user cancel. The confirmation phrase is checked here, not
    /// in the UI: the request must repeat the subscription's plan code.
    pub async fn cancel(
        &self,
        club_id: &str,
        subscription_id: &str,
        principal_id: &str,
        confirmation: &str,
    ) -> Result<Subscription, AppError> {
        let mut subscription = self
            .subscription_repo
            .find_by_id(club_id, subscription_id)
            .await?
            .ok_or(AppError::NotFound("Subscription not found".into()))?;

        if subscription.principal_id != principal_id {
            return Err(AppError::Forbidden("Subscription belongs to another principal".into()));
        }
        if confirmation != subscription.plan_code {
            return Err(AppError::Validation(
                "Confirmation phrase does not match the plan".into(),
            ));
        }
        if subscription.status == subscription_status::CANCELED {
            return Ok(subscription);
        }

        subscription.status = subscription_status::CANCELED.to_string();
        subscription.next_retry_at = None;
        let canceled = self.subscription_repo.update(&subscription).await?;
        info!("Subscription canceled by owner: {}", canceled.id);
        Ok(canceled)
    }

    pub async fn add_payment_method(&self, principal_id: &str, method_ref: &str) -> Result<(), AppError> {
        let method = PaymentMethod {
            principal_id: principal_id.to_string(),
            method_ref: method_ref.to_string(),
            created_at: Utc::now(),
        };
        self.subscription_repo.add_payment_method(&method).await
    }

    /// The repository rejects removal while any non-canceled subscription
    /// still bills against the method.
    pub async fn remove_payment_method(&self, principal_id: &str, method_ref: &str) -> Result<(), AppError> {
        self.subscription_repo
            .remove_payment_method(principal_id, method_ref)
            .await
    }
}
