use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::api::dtos::requests::{
    AddPaymentMethodRequest, CancelSubscriptionRequest, CreateSubscriptionRequest,
};
use crate::api::extractors::{club::ClubContext, principal::Principal};
use crate::domain::models::subscription::NewSubscriptionParams;
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    principal: Principal,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = state
        .billing
        .subscribe(NewSubscriptionParams {
            club_id: club.id.clone(),
            principal_id: principal.id,
            plan_code: payload.plan_code,
            amount_minor: payload.amount_minor,
            currency: club.currency.clone(),
            period_days: payload.period_days,
            payment_method_ref: payload.payment_method_ref,
        })
        .await?;
    Ok(Json(subscription))
}

/// Cancel is irreversible, so the request must repeat the plan code as a
/// confirmation phrase; the check lives server-side, the UI prompt is
/// only a convenience.
pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    ClubContext(club): ClubContext,
    principal: Principal,
    Path((_, subscription_id)): Path<(String, String)>,
    Json(payload): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let canceled = state
        .billing
        .cancel(&club.id, &subscription_id, &principal.id, &payload.confirmation)
        .await?;
    Ok(Json(canceled))
}

pub async fn add_payment_method(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<AddPaymentMethodRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.method_ref.is_empty() {
        return Err(AppError::Validation("Payment method reference is required".into()));
    }
    state
        .billing
        .add_payment_method(&principal.id, &payload.method_ref)
        .await?;
    Ok(Json(json!({ "status": "added" })))
}

pub async fn list_payment_methods(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let methods = state
        .subscription_repo
        .list_payment_methods(&principal.id)
        .await?;
    Ok(Json(methods))
}

pub async fn remove_payment_method(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(method_ref): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .billing
        .remove_payment_method(&principal.id, &method_ref)
        .await?;
    Ok(Json(json!({ "status": "removed" })))
}
