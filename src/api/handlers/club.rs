use axum::{extract::{Path, State}, response::IntoResponse, Json};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::CreateClubRequest;
use crate::api::dtos::responses::ClubCreatedResponse;
use crate::domain::models::club::Club;
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_club(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateClubRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.slug.is_empty() || payload.name.is_empty() {
        return Err(AppError::Validation("Slug and name are required".into()));
    }
    if payload.timezone.parse::<Tz>().is_err() {
        return Err(AppError::Validation("Unknown timezone".into()));
    }
    if payload.currency.len() != 3 {
        return Err(AppError::Validation("Currency must be a 3-letter code".into()));
    }

    let booking_prefix = payload.booking_prefix.unwrap_or_else(|| {
        payload
            .slug
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_uppercase()
    });
    if booking_prefix.is_empty() {
        return Err(AppError::Validation("Booking prefix cannot be empty".into()));
    }

    let club = Club::new(
        payload.slug,
        payload.name,
        payload.timezone,
        payload.currency.to_uppercase(),
        booking_prefix,
    );

    let created = state.club_repo.create(&club).await?;
    info!("Club created: {} ({})", created.id, created.slug);

    Ok(Json(ClubCreatedResponse {
        club_id: created.id,
        slug: created.slug,
    }))
}

pub async fn get_club_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let club = state
        .club_repo
        .find_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound("Club not found".into()))?;
    Ok(Json(club))
}
