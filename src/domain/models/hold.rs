use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

pub mod hold_status {
    pub const AWAITING_PAYMENT: &str = "AWAITING_PAYMENT";
    pub const CONFIRMED: &str = "CONFIRMED";
    pub const FAILED: &str = "FAILED";
    pub const EXPIRED: &str = "EXPIRED";
    pub const RELEASED: &str = "RELEASED";
}

/// Exclusive, time-boxed claim on a resource interval while payment is in
/// flight. The row doubles as the reservation-attempt record: every
/// transition away from AWAITING_PAYMENT is a compare-and-set on
/// (status, version), so a finalize and an expiry can never both win.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Hold {
    pub id: String,
    pub club_id: String,
    pub resource_id: String,
    pub principal_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub amount_minor: i64,
    pub currency: String,
    pub contact_email: Option<String>,
    pub status: String,
    pub payment_intent_id: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct NewHoldParams {
    pub club_id: String,
    pub resource_id: String,
    pub principal_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub amount_minor: i64,
    pub currency: String,
    pub contact_email: Option<String>,
    pub ttl: Duration,
}

impl Hold {
    pub fn new(params: NewHoldParams) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            club_id: params.club_id,
            resource_id: params.resource_id,
            principal_id: params.principal_id,
            start_time: params.start_time,
            end_time: params.end_time,
            amount_minor: params.amount_minor,
            currency: params.currency,
            contact_email: params.contact_email,
            status: hold_status::AWAITING_PAYMENT.to_string(),
            payment_intent_id: None,
            version: 0,
            created_at: now,
            expires_at: now + params.ttl,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == hold_status::AWAITING_PAYMENT && self.expires_at > now
    }

    pub fn is_terminal(&self) -> bool {
        self.status != hold_status::AWAITING_PAYMENT
    }

    /// Deterministic key for provider intent creation, so a retried create
    /// against the same hold cannot mint a second charge.
    pub fn idempotency_key(&self) -> String {
        format!("hold-{}", self.id)
    }
}
