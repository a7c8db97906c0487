use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use tera::Tera;
use tracing::{error, info, warn};

use crate::domain::models::booking::{booking_status, Booking};
use crate::domain::models::club::Club;
use crate::domain::models::hold::{hold_status, Hold, NewHoldParams};
use crate::domain::models::payment::{format_minor_units, intent_status};
use crate::domain::models::resource::Resource;
use crate::domain::ports::{
    BookingRepository, ClubRepository, EmailService, HoldRepository, PaymentGateway,
    ResourceRepository,
};
use crate::domain::services::availability::is_interval_free;
use crate::domain::services::calendar::generate_ics;
use crate::error::AppError;

pub struct CreateReservationParams {
    pub resource_id: String,
    pub principal_id: String,
    pub contact_email: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price_minor: i64,
}

pub struct ReservationCreated {
    pub hold: Hold,
    pub client_secret: Option<String>,
}

/// The per-attempt state machine coordinating hold acquisition, the
/// payment provider, and booking persistence. Every transition away from
/// AWAITING_PAYMENT funnels through the hold repository's compare-and-set,
/// so finalize, cancel, and expiry cannot double-settle an attempt.
pub struct ReservationService {
    hold_repo: Arc<dyn HoldRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    club_repo: Arc<dyn ClubRepository>,
    resource_repo: Arc<dyn ResourceRepository>,
    gateway: Arc<dyn PaymentGateway>,
    email_service: Arc<dyn EmailService>,
    templates: Arc<Tera>,
    hold_ttl: Duration,
}

impl ReservationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hold_repo: Arc<dyn HoldRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        club_repo: Arc<dyn ClubRepository>,
        resource_repo: Arc<dyn ResourceRepository>,
        gateway: Arc<dyn PaymentGateway>,
        email_service: Arc<dyn EmailService>,
        templates: Arc<Tera>,
        hold_ttl: Duration,
    ) -> Self {
        Self {
            hold_repo,
            booking_repo,
            club_repo,
            resource_repo,
            gateway,
            email_service,
            templates,
            hold_ttl,
        }
    }

    /// Checkout start: validate, acquire the hold, create the provider
    /// intent under the hold-derived idempotency key. A conflict on the
    /// slot is terminal for this attempt; the caller picks another slot.
    pub async fn create(
        &self,
        club: &Club,
        params: CreateReservationParams,
    ) -> Result<ReservationCreated, AppError> {
        let resource = self
            .resource_repo
            .find_by_id(&club.id, &params.resource_id)
            .await?
            .ok_or(AppError::NotFound("Resource not found".into()))?;

        let now = Utc::now();
        validate_interval(club, &resource, params.start_time, params.end_time, now)?;

        if params.price_minor <= 0 {
            return Err(AppError::Validation("Price must be a positive amount".into()));
        }

        // Availability read before the hold write: a taken slot fails fast
        // without minting a hold id or touching the provider. The acquire
        // below remains the authoritative, transactional check.
        let bookings = self
            .booking_repo
            .list_confirmed_in_range(&resource.id, params.start_time, params.end_time)
            .await?;
        let holds = self
            .hold_repo
            .list_active_in_range(&resource.id, params.start_time, params.end_time, now)
            .await?;
        if !is_interval_free(&bookings, &holds, params.start_time, params.end_time, now) {
            return Err(AppError::SlotUnavailable);
        }

        let hold = Hold::new(NewHoldParams {
            club_id: club.id.clone(),
            resource_id: resource.id.clone(),
            principal_id: params.principal_id,
            start_time: params.start_time,
            end_time: params.end_time,
            amount_minor: params.price_minor,
            currency: club.currency.clone(),
            contact_email: params.contact_email,
            ttl: self.hold_ttl,
        });

        let mut hold = self.hold_repo.acquire(&hold).await?;
        info!("Hold acquired: {} on resource {}", hold.id, hold.resource_id);

        let intent = match self
            .gateway
            .create_intent(hold.amount_minor, &hold.currency, &hold.idempotency_key())
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                // The slot must not stay blocked behind a payment setup
                // failure; release before surfacing.
                let _ = self
                    .hold_repo
                    .claim(&hold.id, hold_status::AWAITING_PAYMENT, hold.version, hold_status::RELEASED)
                    .await;
                warn!("Intent creation failed, hold {} released", hold.id);
                return Err(e);
            }
        };

        self.hold_repo.set_payment_intent(&hold.id, &intent.id).await?;
        hold.payment_intent_id = Some(intent.id.clone());

        info!("Reservation started: hold {} intent {}", hold.id, intent.id);
        Ok(ReservationCreated {
            hold,
            client_secret: intent.client_secret,
        })
    }

    /// Idempotent settlement. Called by the client's confirm request and
    /// by the webhook reconciler; both may race for the same success
    /// event and both get the same booking back.
    pub async fn finalize(
        &self,
        club: &Club,
        hold_id: &str,
        payment_intent_id: &str,
    ) -> Result<Booking, AppError> {
        let hold = self
            .hold_repo
            .find_by_id(&club.id, hold_id)
            .await?
            .ok_or(AppError::NotFound("Hold not found".into()))?;
        self.finalize_hold(club, hold, payment_intent_id).await
    }

    /// Webhook entry point: resolve the hold owning the intent first.
    pub async fn finalize_by_intent(&self, payment_intent_id: &str) -> Result<Booking, AppError> {
        let hold = self
            .hold_repo
            .find_by_intent(payment_intent_id)
            .await?
            .ok_or(AppError::NotFound("No hold for payment intent".into()))?;
        let club = self
            .club_repo
            .find_by_id(&hold.club_id)
            .await?
            .ok_or(AppError::NotFound("Club not found".into()))?;
        self.finalize_hold(&club, hold, payment_intent_id).await
    }

    async fn finalize_hold(
        &self,
        club: &Club,
        hold: Hold,
        payment_intent_id: &str,
    ) -> Result<Booking, AppError> {
        if hold.status == hold_status::CONFIRMED {
            // Duplicate finalize is not an error: hand back the booking
            // the earlier settlement produced.
            return self
                .booking_repo
                .find_by_hold(&hold.id)
                .await?
                .ok_or(AppError::InternalWithMsg(format!(
                    "Hold {} is CONFIRMED but has no booking",
                    hold.id
                )));
        }

        let expected_intent = hold
            .payment_intent_id
            .as_deref()
            .ok_or(AppError::Validation("Hold has no payment intent".into()))?;
        if expected_intent != payment_intent_id {
            return Err(AppError::Validation(
                "Payment intent does not belong to this hold".into(),
            ));
        }

        // Server-side verification. A client-asserted "succeeded" is never
        // trusted; a transport timeout surfaces as retriable and leaves
        // the hold untouched.
        let intent = self.gateway.retrieve_intent(payment_intent_id).await?;

        if intent.amount_minor != hold.amount_minor
            || !intent.currency.eq_ignore_ascii_case(&hold.currency)
        {
            return Err(AppError::Validation(
                "Payment intent amount does not match the hold".into(),
            ));
        }

        match intent.status.as_str() {
            intent_status::SUCCEEDED => self.settle_succeeded(club, hold, &intent.id).await,
            intent_status::FAILED | intent_status::CANCELED => {
                let _ = self
                    .hold_repo
                    .claim(&hold.id, hold_status::AWAITING_PAYMENT, hold.version, hold_status::FAILED)
                    .await;
                info!("Reservation failed: hold {} intent {}", hold.id, intent.id);
                Err(AppError::PaymentFailed(format!("Payment {}", intent.status)))
            }
            _ => Err(AppError::PaymentPending),
        }
    }

    async fn settle_succeeded(
        &self,
        club: &Club,
        hold: Hold,
        intent_id: &str,
    ) -> Result<Booking, AppError> {
        let now = Utc::now();

        if hold.is_terminal() || hold.expires_at <= now {
            // Payment completed against a hold that already lapsed; the
            // slot may belong to someone else by now. Refund the stale
            // intent, never overwrite the new owner.
            if !hold.is_terminal() {
                let _ = self
                    .hold_repo
                    .claim(&hold.id, hold_status::AWAITING_PAYMENT, hold.version, hold_status::EXPIRED)
                    .await;
            }
            warn!(
                "Stale payment success for hold {} (status {}), refunding intent {}",
                hold.id, hold.status, intent_id
            );
            if let Err(e) = self.gateway.refund(intent_id, hold.amount_minor).await {
                error!("Refund of stale intent {} failed: {:?}", intent_id, e);
            }
            return Err(AppError::HoldExpired);
        }

        match self.booking_repo.confirm(club, &hold, intent_id).await {
            Ok(booking) => {
                info!(
                    "Booking confirmed: {} ({}) for hold {}",
                    booking.id, booking.booking_number, hold.id
                );
                self.notify_confirmation(club, &hold, &booking);
                Ok(booking)
            }
            Err(AppError::Conflict(_)) => {
                // Lost the claim. Either a racing finalize already
                // confirmed (return its booking) or the sweep expired us.
                let current = self
                    .hold_repo
                    .find_by_id(&club.id, &hold.id)
                    .await?
                    .ok_or(AppError::Internal)?;
                if current.status == hold_status::CONFIRMED {
                    return self
                        .booking_repo
                        .find_by_hold(&hold.id)
                        .await?
                        .ok_or(AppError::Internal);
                }
                warn!(
                    "Claim lost to {} for hold {}, refunding intent {}",
                    current.status, hold.id, intent_id
                );
                if let Err(e) = self.gateway.refund(intent_id, hold.amount_minor).await {
                    error!("Refund of intent {} failed: {:?}", intent_id, e);
                }
                Err(AppError::HoldExpired)
            }
            Err(e) => Err(e),
        }
    }

    /// Releases a hold whose payment never terminated: failed or canceled
    /// provider events with nothing to settle. Loses quietly when the
    /// hold was confirmed in the meantime (out-of-order delivery).
    pub async fn release_for_failed_payment(&self, payment_intent_id: &str) -> Result<(), AppError> {
        let Some(hold) = self.hold_repo.find_by_intent(payment_intent_id).await? else {
            warn!("No hold for failed intent {}", payment_intent_id);
            return Ok(());
        };
        if hold.status == hold_status::CONFIRMED {
            info!(
                "Ignoring late failure event for confirmed hold {} (intent {})",
                hold.id, payment_intent_id
            );
            return Ok(());
        }
        if hold.status == hold_status::AWAITING_PAYMENT {
            let _ = self
                .hold_repo
                .claim(&hold.id, hold_status::AWAITING_PAYMENT, hold.version, hold_status::FAILED)
                .await;
            info!("Hold {} released after failed payment", hold.id);
        }
        Ok(())
    }

    /// Sweep entry point. Only transitions AWAITING_PAYMENT holds whose
    /// TTL elapsed; a hold that was finalized concurrently wins the claim
    /// and the expiry becomes a no-op.
    pub async fn expire(&self, hold: &Hold) -> Result<bool, AppError> {
        let now = Utc::now();
        if hold.status != hold_status::AWAITING_PAYMENT || hold.expires_at > now {
            return Ok(false);
        }

        let won = self
            .hold_repo
            .claim(&hold.id, hold_status::AWAITING_PAYMENT, hold.version, hold_status::EXPIRED)
            .await?;

        if won {
            info!("Hold expired: {} (resource {})", hold.id, hold.resource_id);
            if let Some(intent_id) = &hold.payment_intent_id {
                if let Err(e) = self.gateway.cancel_intent(intent_id).await {
                    warn!("Cancel of intent {} for expired hold failed: {:?}", intent_id, e);
                }
            }
        }
        Ok(won)
    }

    /// Explicit abandon by the hold owner. Idempotent; safe against a
    /// concurrent finalize (the claim decides, the loser cleans up).
    pub async fn cancel(&self, club: &Club, hold_id: &str, principal_id: &str) -> Result<(), AppError> {
        let hold = self
            .hold_repo
            .find_by_id(&club.id, hold_id)
            .await?
            .ok_or(AppError::NotFound("Hold not found".into()))?;

        if hold.principal_id != principal_id {
            return Err(AppError::Forbidden("Hold belongs to another principal".into()));
        }

        match hold.status.as_str() {
            hold_status::RELEASED | hold_status::EXPIRED | hold_status::FAILED => return Ok(()),
            hold_status::CONFIRMED => {
                return Err(AppError::Conflict("Reservation already confirmed".into()))
            }
            _ => {}
        }

        let won = self
            .hold_repo
            .claim(&hold.id, hold_status::AWAITING_PAYMENT, hold.version, hold_status::RELEASED)
            .await?;

        if !won {
            let current = self
                .hold_repo
                .find_by_id(&club.id, hold_id)
                .await?
                .ok_or(AppError::Internal)?;
            if current.status == hold_status::CONFIRMED {
                return Err(AppError::Conflict("Reservation already confirmed".into()));
            }
            return Ok(());
        }

        if let Some(intent_id) = &hold.payment_intent_id {
            if let Err(e) = self.gateway.cancel_intent(intent_id).await {
                warn!("Cancel of intent {} failed: {:?}", intent_id, e);
            }
        }
        info!("Hold released by owner: {}", hold.id);
        Ok(())
    }

    /// Keeps a hold alive through a slow payment confirmation (3-D Secure
    /// challenges). Fails once the hold has lapsed.
    pub async fn extend(&self, club: &Club, hold_id: &str, principal_id: &str) -> Result<Hold, AppError> {
        let hold = self
            .hold_repo
            .find_by_id(&club.id, hold_id)
            .await?
            .ok_or(AppError::NotFound("Hold not found".into()))?;

        if hold.principal_id != principal_id {
            return Err(AppError::Forbidden("Hold belongs to another principal".into()));
        }

        let now = Utc::now();
        if !hold.is_active(now) {
            return Err(AppError::HoldExpired);
        }

        let extended = self.hold_repo.extend(&hold.id, now + self.hold_ttl).await?;
        if !extended {
            return Err(AppError::HoldExpired);
        }

        self.hold_repo
            .find_by_id(&club.id, hold_id)
            .await?
            .ok_or(AppError::Internal)
    }

    /// Admin cancel of a confirmed booking: refunds the captured intent
    /// and frees the slot. Idempotent on repeat.
    pub async fn refund_booking(&self, club: &Club, booking_id: &str) -> Result<Booking, AppError> {
        let booking = self
            .booking_repo
            .find_by_id(&club.id, booking_id)
            .await?
            .ok_or(AppError::NotFound("Booking not found".into()))?;

        if booking.status == booking_status::REFUNDED {
            return Ok(booking);
        }
        if booking.status != booking_status::CONFIRMED {
            return Err(AppError::Conflict("Booking is not refundable".into()));
        }

        self.gateway
            .refund(&booking.payment_intent_id, booking.price_minor)
            .await?;

        let refunded = self
            .booking_repo
            .set_status(&club.id, booking_id, booking_status::REFUNDED)
            .await?;
        info!("Booking refunded: {} ({})", refunded.id, refunded.booking_number);
        Ok(refunded)
    }

    /// Fire-and-forget confirmation email with an ICS attachment. A mail
    /// failure is logged and never rolls back the booking.
    fn notify_confirmation(&self, club: &Club, hold: &Hold, booking: &Booking) {
        let Some(recipient) = hold.contact_email.clone() else {
            return;
        };

        let club = club.clone();
        let booking = booking.clone();
        let resource_repo = self.resource_repo.clone();
        let email_service = self.email_service.clone();
        let templates = self.templates.clone();

        tokio::spawn(async move {
            let resource_name = match resource_repo.find_by_id(&club.id, &booking.resource_id).await {
                Ok(Some(resource)) => resource.name,
                _ => "your booking".to_string(),
            };

            let tz: Tz = club.timezone.parse().unwrap_or(chrono_tz::UTC);
            let local_start = booking.start_time.with_timezone(&tz);

            let mut context = tera::Context::new();
            context.insert("club_name", &club.name);
            context.insert("resource_name", &resource_name);
            context.insert("booking_number", &booking.booking_number);
            context.insert("start_time", &local_start.format("%Y-%m-%d %H:%M").to_string());
            context.insert("timezone", &club.timezone);
            context.insert("price", &format_minor_units(booking.price_minor));
            context.insert("currency", &booking.currency);

            let html = match templates.render("confirmation.html", &context) {
                Ok(html) => html,
                Err(e) => {
                    error!("Confirmation template render failed: {:?}", e);
                    return;
                }
            };

            let subject = format!("Booking confirmed: {}", booking.booking_number);
            let ics = generate_ics(&club, &resource_name, &booking);

            if let Err(e) = email_service
                .send(&recipient, &subject, &html, Some("booking.ics"), Some(ics.as_bytes()))
                .await
            {
                warn!(
                    "Confirmation email for booking {} failed (booking unaffected): {:?}",
                    booking.id, e
                );
            }
        });
    }
}

/// Server-side re-validation of the requested interval; the HTTP layer is
/// the trust boundary regardless of what the UI already checked.
fn validate_interval(
    club: &Club,
    resource: &Resource,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if start.timestamp() % 60 != 0
        || end.timestamp() % 60 != 0
        || start.timestamp_subsec_nanos() != 0
        || end.timestamp_subsec_nanos() != 0
    {
        return Err(AppError::Validation("Interval must be minute-granular".into()));
    }
    if start >= end {
        return Err(AppError::Validation("Interval start must precede its end".into()));
    }
    if start <= now {
        return Err(AppError::Validation("Cannot reserve a slot in the past".into()));
    }

    let tz: Tz = club.timezone.parse().unwrap_or(chrono_tz::UTC);
    let local_start = start.with_timezone(&tz);
    let local_end = end.with_timezone(&tz);

    let start_minute = (local_start.hour() * 60 + local_start.minute()) as i32;
    let end_minute = if local_end.date_naive() == local_start.date_naive() {
        (local_end.hour() * 60 + local_end.minute()) as i32
    } else if local_end.date_naive() == local_start.date_naive() + Duration::days(1)
        && local_end.hour() == 0
        && local_end.minute() == 0
    {
        1440
    } else {
        return Err(AppError::Validation("Interval must stay within one day".into()));
    };

    if start_minute < resource.open_minute || end_minute > resource.close_minute {
        return Err(AppError::Validation("Interval is outside operating hours".into()));
    }

    Ok(())
}
