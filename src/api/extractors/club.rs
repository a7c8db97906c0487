use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::models::club::Club;
use crate::state::AppState;

/// Resolves the `{club_id}` path segment against the club repository.
/// There is no fallback tenant: a request without a known club id never
/// reaches a handler.
pub struct ClubContext(pub Club);

impl FromRequestParts<Arc<AppState>> for ClubContext {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let params: Path<HashMap<String, String>> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        let club_id = params.get("club_id").ok_or(StatusCode::BAD_REQUEST)?;

        match state.club_repo.find_by_id(club_id).await {
            Ok(Some(club)) => Ok(ClubContext(club)),
            Ok(None) => Err(StatusCode::NOT_FOUND),
            Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}
