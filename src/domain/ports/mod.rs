use crate::domain::models::{
    booking::Booking, club::Club, hold::Hold, payment::PaymentIntent,
    resource::Resource, subscription::{PaymentMethod, Subscription},
    webhook_event::WebhookEvent,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait ClubRepository: Send + Sync {
    async fn create(&self, club: &Club) -> Result<Club, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Club>, AppError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Club>, AppError>;
}

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn create(&self, resource: &Resource) -> Result<Resource, AppError>;
    async fn find_by_id(&self, club_id: &str, id: &str) -> Result<Option<Resource>, AppError>;
    async fn list_by_club(&self, club_id: &str) -> Result<Vec<Resource>, AppError>;
}

/// The single mutation funnel for slot inventory. `acquire` is the one
/// concurrency-control point in the system: the overlap check and the
/// insert happen inside one database transaction, so of two racing
/// acquires on overlapping intervals exactly one wins.
#[async_trait]
pub trait HoldRepository: Send + Sync {
    /// Atomic check-and-insert. Fails with `SlotUnavailable` when an
    /// active hold or a confirmed booking overlaps the interval.
    async fn acquire(&self, hold: &Hold) -> Result<Hold, AppError>;
    async fn find_by_id(&self, club_id: &str, id: &str) -> Result<Option<Hold>, AppError>;
    async fn find_by_intent(&self, intent_id: &str) -> Result<Option<Hold>, AppError>;
    async fn set_payment_intent(&self, hold_id: &str, intent_id: &str) -> Result<(), AppError>;
    /// Compare-and-set on (status, version). Returns false when the claim
    /// was lost to a concurrent transition.
    async fn claim(
        &self,
        hold_id: &str,
        from_status: &str,
        version: i64,
        to_status: &str,
    ) -> Result<bool, AppError>;
    /// Pushes expiry out while payment is still AWAITING_PAYMENT and not
    /// yet expired. Returns false once the hold has lapsed.
    async fn extend(&self, hold_id: &str, new_expires_at: DateTime<Utc>) -> Result<bool, AppError>;
    /// Active (unexpired, AWAITING_PAYMENT) holds overlapping the range.
    async fn list_active_in_range(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Hold>, AppError>;
    async fn find_expired(&self, now: DateTime<Utc>, limit: i32) -> Result<Vec<Hold>, AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// One transaction: claim the hold CONFIRMED (CAS on status+version),
    /// issue the next club-scoped booking number, insert the booking.
    /// A lost claim rolls everything back and surfaces as `Conflict`.
    async fn confirm(
        &self,
        club: &Club,
        hold: &Hold,
        payment_intent_id: &str,
    ) -> Result<Booking, AppError>;
    async fn find_by_id(&self, club_id: &str, id: &str) -> Result<Option<Booking>, AppError>;
    async fn find_by_hold(&self, hold_id: &str) -> Result<Option<Booking>, AppError>;
    async fn list_by_club(&self, club_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn list_confirmed_in_range(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError>;
    async fn set_status(&self, club_id: &str, id: &str, status: &str) -> Result<Booking, AppError>;
}

#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn seen(&self, event_id: &str) -> Result<bool, AppError>;
    /// Records a processed event. Returns false (not an error) when the
    /// event id was already recorded by a concurrent delivery.
    async fn record(&self, event: &WebhookEvent) -> Result<bool, AppError>;
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> Result<Subscription, AppError>;
    async fn find_by_id(&self, club_id: &str, id: &str) -> Result<Option<Subscription>, AppError>;
    async fn update(&self, subscription: &Subscription) -> Result<Subscription, AppError>;
    /// Subscriptions whose period has ended or whose dunning retry is due.
    async fn find_due(&self, now: DateTime<Utc>, limit: i32) -> Result<Vec<Subscription>, AppError>;
    async fn add_payment_method(&self, method: &PaymentMethod) -> Result<(), AppError>;
    /// Deletes a stored method. Rejected with `Conflict` while any
    /// non-canceled subscription still bills against it.
    async fn remove_payment_method(&self, principal_id: &str, method_ref: &str) -> Result<(), AppError>;
    async fn list_payment_methods(&self, principal_id: &str) -> Result<Vec<PaymentMethod>, AppError>;
}

/// Boundary to the card payment provider. Calls are side-effecting but
/// retry-safe only when made with the idempotency key.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, AppError>;
    /// Status verification. A transport timeout maps to
    /// `PaymentVerificationTimeout` ("unknown", retriable), never to a
    /// payment failure.
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, AppError>;
    async fn cancel_intent(&self, intent_id: &str) -> Result<(), AppError>;
    async fn refund(&self, intent_id: &str, amount_minor: i64) -> Result<(), AppError>;
    /// Off-session charge against a vaulted payment method (recurring
    /// billing).
    async fn charge_saved_method(
        &self,
        amount_minor: i64,
        currency: &str,
        method_ref: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachment_name: Option<&str>,
        attachment_data: Option<&[u8]>,
    ) -> Result<(), AppError>;
}
