use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::responses::BookingResponse;
use crate::api::extractors::{club::ClubContext, principal::Principal};
use crate::error::AppError;
use crate::state::AppState;

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    _principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.booking_repo.list_by_club(&club.id).await?;
    let response: Vec<BookingResponse> = bookings.into_iter().map(BookingResponse::from).collect();
    Ok(Json(response))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    _principal: Principal,
    Path((_, booking_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state
        .booking_repo
        .find_by_id(&club.id, &booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;
    Ok(Json(BookingResponse::from(booking)))
}

/// Admin cancel: refunds the captured payment and frees the slot.
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    _principal: Principal,
    Path((_, booking_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let refunded = state.reservations.refund_booking(&club, &booking_id).await?;
    info!("Booking cancelled and refunded: {}", refunded.id);
    Ok(Json(BookingResponse::from(refunded)))
}
