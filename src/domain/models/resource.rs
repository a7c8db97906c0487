use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub mod resource_type {
    pub const COURT: &str = "COURT";
    pub const EVENT: &str = "EVENT";
    pub const INSTRUCTOR: &str = "INSTRUCTOR";
}

/// A bookable unit owned by a club. `open_minute`/`close_minute` bound the
/// operating window in club-local minutes from midnight.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Resource {
    pub id: String,
    pub club_id: String,
    pub resource_type: String,
    pub name: String,
    pub open_minute: i32,
    pub close_minute: i32,
    pub created_at: DateTime<Utc>,
}

pub struct NewResourceParams {
    pub club_id: String,
    pub resource_type: String,
    pub name: String,
    pub open_minute: i32,
    pub close_minute: i32,
}

impl Resource {
    pub fn new(params: NewResourceParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            club_id: params.club_id,
            resource_type: params.resource_type,
            name: params.name,
            open_minute: params.open_minute,
            close_minute: params.close_minute,
            created_at: Utc::now(),
        }
    }
}
