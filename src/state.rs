use std::sync::Arc;

use tera::Tera;

use crate::config::Config;
use crate::domain::ports::{
    BookingRepository, ClubRepository, EmailService, HoldRepository, PaymentGateway,
    ResourceRepository, SubscriptionRepository, WebhookEventRepository,
};
use crate::domain::services::billing::BillingService;
use crate::domain::services::reconciler::WebhookReconciler;
use crate::domain::services::reservation::ReservationService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub club_repo: Arc<dyn ClubRepository>,
    pub resource_repo: Arc<dyn ResourceRepository>,
    pub hold_repo: Arc<dyn HoldRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub webhook_repo: Arc<dyn WebhookEventRepository>,
    pub subscription_repo: Arc<dyn SubscriptionRepository>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub email_service: Arc<dyn EmailService>,
    pub reservations: Arc<ReservationService>,
    pub billing: Arc<BillingService>,
    pub reconciler: Arc<WebhookReconciler>,
    pub templates: Arc<Tera>,
}
