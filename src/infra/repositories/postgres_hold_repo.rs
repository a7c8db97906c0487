use crate::domain::{models::hold::Hold, ports::HoldRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

pub struct PostgresHoldRepo {
    pool: PgPool,
}

impl PostgresHoldRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HoldRepository for PostgresHoldRepo {
    async fn acquire(&self, hold: &Hold) -> Result<Hold, AppError> {
        // Postgres snapshots would let two concurrent transactions both
        // pass the overlap check, so acquires on the same resource are
        // serialized with a transaction-scoped advisory lock first.
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&hold.resource_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let now = Utc::now();
        let blocked = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM holds
                 WHERE resource_id = $1 AND status = 'AWAITING_PAYMENT' AND expires_at > $2
                   AND start_time < $3 AND end_time > $4)
                +
                (SELECT COUNT(*) FROM bookings
                 WHERE resource_id = $1 AND status = 'CONFIRMED'
                   AND start_time < $3 AND end_time > $4)
                AS count
            "#,
        )
        .bind(&hold.resource_id)
        .bind(now)
        .bind(hold.end_time)
        .bind(hold.start_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if blocked.get::<i64, _>("count") > 0 {
            return Err(AppError::SlotUnavailable);
        }

        let created = sqlx::query_as::<_, Hold>(
            r#"
            INSERT INTO holds (id, club_id, resource_id, principal_id, start_time, end_time,
                               amount_minor, currency, contact_email, status, payment_intent_id,
                               version, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
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
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, club_id: &str, id: &str) -> Result<Option<Hold>, AppError> {
        sqlx::query_as::<_, Hold>("SELECT * FROM holds WHERE club_id = $1 AND id = $2")
            .bind(club_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_intent(&self, intent_id: &str) -> Result<Option<Hold>, AppError> {
        sqlx::query_as::<_, Hold>("SELECT * FROM holds WHERE payment_intent_id = $1")
            .bind(intent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn set_payment_intent(&self, hold_id: &str, intent_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE holds SET payment_intent_id = $1 WHERE id = $2")
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
            "UPDATE holds SET status = $1, version = version + 1 WHERE id = $2 AND status = $3 AND version = $4",
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
            "UPDATE holds SET expires_at = $1 WHERE id = $2 AND status = 'AWAITING_PAYMENT' AND expires_at > $3",
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
            "SELECT * FROM holds WHERE resource_id = $1 AND status = 'AWAITING_PAYMENT' AND expires_at > $2 AND start_time < $3 AND end_time > $4",
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
            "SELECT * FROM holds WHERE status = 'AWAITING_PAYMENT' AND expires_at <= $1 ORDER BY expires_at ASC LIMIT $2",
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }
}
