use crate::domain::{models::webhook_event::WebhookEvent, ports::WebhookEventRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

pub struct PostgresWebhookRepo {
    pool: PgPool,
}

impl PostgresWebhookRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookRepo {
    async fn seen(&self, event_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM webhook_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn record(&self, event: &WebhookEvent) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO webhook_events (event_id, event_type, intent_id, received_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(&event.intent_id)
        .bind(event.received_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            // A concurrent delivery of the same event won the insert.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE received_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
