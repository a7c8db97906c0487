use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub mod subscription_status {
    pub const ACTIVE: &str = "ACTIVE";
    pub const PAST_DUE: &str = "PAST_DUE";
    pub const CANCELED: &str = "CANCELED";
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Subscription {
    pub id: String,
    pub club_id: String,
    pub principal_id: String,
    pub plan_code: String,
    pub amount_minor: i64,
    pub currency: String,
    pub period_days: i32,
    pub status: String,
    pub current_period_end: DateTime<Utc>,
    pub payment_method_ref: String,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub struct NewSubscriptionParams {
    pub club_id: String,
    pub principal_id: String,
    pub plan_code: String,
    pub amount_minor: i64,
    pub currency: String,
    pub period_days: i32,
    pub payment_method_ref: String,
}

impl Subscription {
    pub fn new(params: NewSubscriptionParams) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            club_id: params.club_id,
            principal_id: params.principal_id,
            plan_code: params.plan_code,
            amount_minor: params.amount_minor,
            currency: params.currency,
            period_days: params.period_days,
            status: subscription_status::ACTIVE.to_string(),
            current_period_end: now + chrono::Duration::days(params.period_days as i64),
            payment_method_ref: params.payment_method_ref,
            retry_count: 0,
            next_retry_at: None,
            created_at: now,
        }
    }

    /// Idempotency key for one billing attempt: the same period and the
    /// same retry never charge twice.
    pub fn billing_key(&self) -> String {
        format!(
            "sub-{}-{}-{}",
            self.id,
            self.current_period_end.timestamp(),
            self.retry_count
        )
    }
}

/// Dunning schedule: three retries spread across a week, then give up.
/// Returns the delay in days before the next attempt, or None when the
/// attempts are exhausted.
pub fn retry_delay_days(failed_attempts: i32) -> Option<i64> {
    match failed_attempts {
        1 => Some(1),
        2 => Some(2),
        3 => Some(4),
        _ => None,
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PaymentMethod {
    pub principal_id: String,
    pub method_ref: String,
    pub created_at: DateTime<Utc>,
}
