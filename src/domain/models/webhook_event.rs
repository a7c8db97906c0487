use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Dedup ledger entry for provider webhook deliveries. Delivery is
/// at-least-once; an event id seen before is acknowledged without
/// reprocessing. Rows older than the retention window are purged by the
/// background sweep.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub intent_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

pub const RETENTION_DAYS: i64 = 30;

impl WebhookEvent {
    pub fn new(event_id: String, event_type: String, intent_id: Option<String>) -> Self {
        Self {
            event_id,
            event_type,
            intent_id,
            received_at: Utc::now(),
        }
    }
}
