use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use std::sync::Arc;

use crate::state::AppState;

/// The already-authenticated caller identity, injected by the auth
/// gateway in front of this service. Session issuance and verification
/// live there; here an absent identity is simply a 401.
pub struct Principal {
    pub id: String,
    pub email: Option<String>,
}

impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-principal-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(StatusCode::UNAUTHORIZED)?
            .to_string();

        let email = parts
            .headers
            .get("x-principal-email")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());

        Ok(Principal { id, email })
    }
}
