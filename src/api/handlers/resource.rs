use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{AvailabilityQuery, CreateResourceRequest};
use crate::api::dtos::responses::{AvailabilityResponse, FreeIntervalResponse};
use crate::api::extractors::club::ClubContext;
use crate::domain::models::resource::{resource_type, NewResourceParams, Resource};
use crate::domain::services::availability::free_intervals;
use crate::error::AppError;
use crate::state::AppState;

fn parse_minute(value: &str, field: &str) -> Result<i32, AppError> {
    let time = NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| AppError::Validation(format!("Invalid {} (HH:MM)", field)))?;
    Ok((time.hour() * 60 + time.minute()) as i32)
}

pub async fn create_resource(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.is_empty() {
        return Err(AppError::Validation("Resource name is required".into()));
    }

    let kind = payload.resource_type.to_uppercase();
    if ![resource_type::COURT, resource_type::EVENT, resource_type::INSTRUCTOR]
        .contains(&kind.as_str())
    {
        return Err(AppError::Validation("Unknown resource type".into()));
    }

    let open_minute = parse_minute(&payload.open_time, "open_time")?;
    let close_minute = parse_minute(&payload.close_time, "close_time")?;
    if open_minute >= close_minute {
        return Err(AppError::Validation("Opening must precede closing".into()));
    }

    let resource = Resource::new(NewResourceParams {
        club_id: club.id.clone(),
        resource_type: kind,
        name: payload.name,
        open_minute,
        close_minute,
    });

    let created = state.resource_repo.create(&resource).await?;
    info!("Resource created: {} in club {}", created.id, club.id);
    Ok(Json(created))
}

pub async fn list_resources(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
) -> Result<impl IntoResponse, AppError> {
    let resources = state.resource_repo.list_by_club(&club.id).await?;
    Ok(Json(resources))
}

/// Free intervals for one club-local date. Confirmed bookings and active
/// holds block; an expired hold reads as free with no sweep involved.
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    Path((_, resource_id)): Path<(String, String)>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let resource = state
        .resource_repo
        .find_by_id(&club.id, &resource_id)
        .await?
        .ok_or(AppError::NotFound("Resource not found".into()))?;

    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format".into()))?;

    let tz: Tz = club.timezone.parse().unwrap_or(chrono_tz::UTC);
    let day_start = tz
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
        .single()
        .ok_or(AppError::Validation("Ambiguous local date".into()))?
        .with_timezone(&Utc);
    let day_end = day_start + chrono::Duration::days(1);

    let now = Utc::now();
    let bookings = state
        .booking_repo
        .list_confirmed_in_range(&resource.id, day_start, day_end)
        .await?;
    let holds = state
        .hold_repo
        .list_active_in_range(&resource.id, day_start, day_end, now)
        .await?;

    let free = free_intervals(&resource, tz, date, &bookings, &holds, now)
        .into_iter()
        .map(|(start, end)| FreeIntervalResponse { start, end })
        .collect();

    Ok(Json(AvailabilityResponse {
        date: query.date,
        free,
    }))
}
