use crate::domain::{models::hold::Hold, ports::HoldRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteHoldRepo {
    pool: SqlitePool,
}

impl SqliteHoldRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HoldRepository for SqliteHoldRepo {
    async fn acquire(&self, hold: &Hold) -> Result<Hold, AppError> {
        // Single guarded statement: SQLite serializes writers, so the
        // overlap check and the insert cannot interleave with a
        // concurrent acquire. No row back means somebody else holds or
        // booked an overlapping interval.
        let now = Utc::now();
        let created = sqlx::query_as::<_, Hold>(
            r#"
            INSERT INTO holds (id, club_id, resource_id, principal_id, start_time, end_time,
                               amount_minor, currency, contact_email, status, payment_intent_id,
                               version, created_at, expires_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM holds
                WHERE resource_id = ? AND status = 'AWAITING_PAYMENT' AND expires_at > ?
                  AND start_time < ? AND end_time > ?
            )
            AND NOT EXISTS (
                SELECT 1 FROM bookings
                WHERE resource_id = ? AND status = 'CONFIRMED'
                  AND start_time < ? AND end_time > ?
            )
            RETURNING *
            "#,
        )
        .bind(&hold.id)
        .bind(&hold.club_id)
        .bind(&hold.resource_id)
        .bind(&hold.principal_id)
        .bind(hold.start_time)
        .bind(hold.end_time)
        .bind(hold.amount_minor)
        .bind(&hold.currency)
        .bind(&hold.contact_email)
        .bind(&hold.status)
        .bind(&hold.payment_intent_id)
        .bind(hold.version)
        .bind(hold.created_at)
        .bind(hold.expires_at)
        .bind(&hold.resource_id)
        .bind(now)
        .bind(hold.end_time)
        .bind(hold.start_time)
        .bind(&hold.resource_id)
        .bind(hold.end_time)
        .bind(hold.start_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        created.ok_or(AppError::SlotUnavailable)
    }

    async fn find_by_id(&self, club_id: &str, id: &str) -> Result<Option<Hold>, AppError> {
        sqlx::query_as::<_, Hold>("SELECT * FROM holds WHERE club_id = ? AND id = ?")
            .bind(club_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_intent(&self, intent_id: &str) -> Result<Option<Hold>, AppError> {
        sqlx::query_as::<_, Hold>("SELECT * FROM holds WHERE payment_intent_id = ?")
            .bind(intent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn set_payment_intent(&self, hold_id: &str, intent_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE holds SET payment_intent_id = ? WHERE id = ?")
            .bind(intent_id)
            .bind(hold_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Hold not found".into()));
        }
        Ok(())
    }

    async fn claim(
        &self,
        hold_id: &str,
        from_status: &str,
        version: i64,
        to_status: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE holds SET status = ?, version = version + 1 WHERE id = ? AND status = ? AND version = ?",
        )
        .bind(to_status)
        .bind(hold_id)
        .bind(from_status)
        .bind(version)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn extend(&self, hold_id: &str, new_expires_at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE holds SET expires_at = ? WHERE id = ? AND status = 'AWAITING_PAYMENT' AND expires_at > ?",
        )
        .bind(new_expires_at)
        .bind(hold_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_active_in_range(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Hold>, AppError> {
        sqlx::query_as::<_, Hold>(
            "SELECT * FROM holds WHERE resource_id = ? AND status = 'AWAITING_PAYMENT' AND expires_at > ? AND start_time < ? AND end_time > ?",
        )
        .bind(resource_id)
        .bind(now)
        .bind(end)
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn find_expired(&self, now: DateTime<Utc>, limit: i32) -> Result<Vec<Hold>, AppError> {
        sqlx::query_as::<_, Hold>(
            "SELECT * FROM holds WHERE status = 'AWAITING_PAYMENT' AND expires_at <= ? ORDER BY expires_at ASC LIMIT ?",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }
}
