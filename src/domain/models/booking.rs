use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::models::hold::Hold;

pub mod booking_status {
    pub const CONFIRMED: &str = "CONFIRMED";
    pub const CANCELLED: &str = "CANCELLED";
    pub const REFUNDED: &str = "REFUNDED";
}

/// The durable, user-visible record. Created exactly once per finalized
/// hold; `hold_id` is unique so a duplicate finalize cannot produce a
/// second row.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub club_id: String,
    pub resource_id: String,
    pub hold_id: String,
    pub principal_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price_minor: i64,
    pub currency: String,
    pub payment_intent_id: String,
    pub status: String,
    pub booking_number: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Builds the confirmed record for a hold whose payment succeeded.
    /// The booking number is issued by the caller at confirmation time,
    /// never pre-allocated to an unpaid attempt.
    pub fn from_hold(hold: &Hold, payment_intent_id: String, booking_number: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            club_id: hold.club_id.clone(),
            resource_id: hold.resource_id.clone(),
            hold_id: hold.id.clone(),
            principal_id: hold.principal_id.clone(),
            start_time: hold.start_time,
            end_time: hold.end_time,
            price_minor: hold.amount_minor,
            currency: hold.currency.clone(),
            payment_intent_id,
            status: booking_status::CONFIRMED.to_string(),
            booking_number,
            created_at: Utc::now(),
        }
    }
}

/// Club-scoped human-readable code, e.g. `MAT-000042`.
pub fn format_booking_number(prefix: &str, seq: i64) -> String {
    format!("{}-{:06}", prefix, seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_number_format() {
        assert_eq!(format_booking_number("MAT", 1), "MAT-000001");
        assert_eq!(format_booking_number("CLUB", 42), "CLUB-000042");
        assert_eq!(format_booking_number("X", 1_234_567), "X-1234567");
    }
}
