use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::booking::Booking;
use crate::domain::models::payment::format_minor_units;

#[derive(Serialize)]
pub struct ClubCreatedResponse {
    pub club_id: String,
    pub slug: String,
}

#[derive(Serialize)]
pub struct ReservationCreatedResponse {
    pub hold_id: String,
    pub client_secret: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct HoldExtendedResponse {
    pub hold_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct FreeIntervalResponse {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub free: Vec<FreeIntervalResponse>,
}

/// Booking plus the decimal price rendering; the integral minor-unit
/// amount is what every other layer carries.
#[derive(Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub price_display: String,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        let price_display = format_minor_units(booking.price_minor);
        Self {
            booking,
            price_display,
        }
    }
}
