use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{ConfirmReservationRequest, CreateReservationRequest};
use crate::api::dtos::responses::{BookingResponse, HoldExtendedResponse, ReservationCreatedResponse};
use crate::api::extractors::{club::ClubContext, principal::Principal};
use crate::domain::services::reservation::CreateReservationParams;
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    principal: Principal,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!(
        "create_reservation: resource {} for principal {}",
        payload.resource_id, principal.id
    );

    let created = state
        .reservations
        .create(
            &club,
            CreateReservationParams {
                resource_id: payload.resource_id,
                principal_id: principal.id,
                contact_email: principal.email,
                start_time: payload.start_time,
                end_time: payload.end_time,
                price_minor: payload.price_minor,
            },
        )
        .await?;

    Ok(Json(ReservationCreatedResponse {
        hold_id: created.hold.id,
        client_secret: created.client_secret,
        expires_at: created.hold.expires_at,
    }))
}

/// Client-side confirm. Races against the provider webhook for the same
/// success event; both paths settle through the same idempotent finalize
/// and both receive the same booking.
pub async fn confirm_reservation(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    _principal: Principal,
    Path((_, hold_id)): Path<(String, String)>,
    Json(payload): Json<ConfirmReservationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state
        .reservations
        .finalize(&club, &hold_id, &payload.payment_intent_id)
        .await?;
    Ok(Json(BookingResponse::from(booking)))
}

pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    principal: Principal,
    Path((_, hold_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state.reservations.cancel(&club, &hold_id, &principal.id).await?;
    Ok(Json(json!({ "status": "released" })))
}

pub async fn extend_reservation(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    principal: Principal,
    Path((_, hold_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let hold = state.reservations.extend(&club, &hold_id, &principal.id).await?;
    Ok(Json(HoldExtendedResponse {
        hold_id: hold.id,
        expires_at: hold.expires_at,
    }))
}
