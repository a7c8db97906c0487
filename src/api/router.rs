use axum::{
    body::Body,
    extract::Request,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

use crate::api::handlers::{booking, club, health, reservation, resource, subscription, webhook};
use crate::state::AppState;
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{error, info, info_span, Span};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Club administration
        .route("/api/v1/clubs", post(club::create_club))
        .route("/api/v1/clubs/by-slug/{slug}", get(club::get_club_by_slug))
        .route("/api/v1/{club_id}/resources", post(resource::create_resource).get(resource::list_resources))

        // Availability (public read)
        .route("/api/v1/{club_id}/resources/{resource_id}/availability", get(resource::get_availability))

        // Reservation pipeline
        .route("/api/v1/{club_id}/reservations", post(reservation::create_reservation))
        .route("/api/v1/{club_id}/reservations/{hold_id}/confirm", post(reservation::confirm_reservation))
        .route("/api/v1/{club_id}/reservations/{hold_id}/cancel", post(reservation::cancel_reservation))
        .route("/api/v1/{club_id}/reservations/{hold_id}/extend", post(reservation::extend_reservation))

        // Bookings
        .route("/api/v1/{club_id}/bookings", get(booking::list_bookings))
        .route("/api/v1/{club_id}/bookings/{booking_id}", get(booking::get_booking))
        .route("/api/v1/{club_id}/bookings/{booking_id}/cancel", post(booking::cancel_booking))

        // Subscriptions & payment methods
        .route("/api/v1/{club_id}/subscriptions", post(subscription::create_subscription))
        .route("/api/v1/{club_id}/subscriptions/{subscription_id}/cancel", post(subscription::cancel_subscription))
        .route("/api/v1/payment-methods", post(subscription::add_payment_method).get(subscription::list_payment_methods))
        .route("/api/v1/payment-methods/{method_ref}", delete(subscription::remove_payment_method))

        // Provider webhook
        .route("/webhooks/payments", post(webhook::payments_webhook))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        club_id = tracing::field::Empty,
                        principal_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
