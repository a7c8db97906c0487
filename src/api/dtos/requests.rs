use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateClubRequest {
    pub slug: String,
    pub name: String,
    pub timezone: String,
    pub currency: String,
    pub booking_prefix: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateResourceRequest {
    pub resource_type: String,
    pub name: String,
    pub open_time: String,
    pub close_time: String,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub resource_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price_minor: i64,
}

#[derive(Deserialize)]
pub struct ConfirmReservationRequest {
    pub payment_intent_id: String,
}

#[derive(Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan_code: String,
    pub amount_minor: i64,
    pub period_days: i32,
    pub payment_method_ref: String,
}

#[derive(Deserialize)]
pub struct CancelSubscriptionRequest {
    pub confirmation: String,
}

#[derive(Deserialize)]
pub struct AddPaymentMethodRequest {
    pub method_ref: String,
}
