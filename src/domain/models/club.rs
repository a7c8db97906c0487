use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Club {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub timezone: String,
    pub currency: String,
    pub booking_prefix: String,
    pub booking_seq: i64,
    pub created_at: DateTime<Utc>,
}

impl Club {
    pub fn new(slug: String, name: String, timezone: String, currency: String, booking_prefix: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            slug,
            name,
            timezone,
            currency,
            booking_prefix,
            booking_seq: 0,
            created_at: Utc::now(),
        }
    }
}
