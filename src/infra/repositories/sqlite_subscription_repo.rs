use crate::domain::models::subscription::{PaymentMethod, Subscription};
use crate::domain::ports::SubscriptionRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

pub struct SqliteSubscriptionRepo {
    pool: SqlitePool,
}

impl SqliteSubscriptionRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SqliteSubscriptionRepo {
    async fn create(&self, subscription: &Subscription) -> Result<Subscription, AppError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, club_id, principal_id, plan_code, amount_minor, currency,
                                       period_days, status, current_period_end, payment_method_ref,
                                       retry_count, next_retry_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&subscription.id)
        .bind(&subscription.club_id)
        .bind(&subscription.principal_id)
        .bind(&subscription.plan_code)
        .bind(subscription.amount_minor)
        .bind(&subscription.currency)
        .bind(subscription.period_days)
        .bind(&subscription.status)
        .bind(subscription.current_period_end)
        .bind(&subscription.payment_method_ref)
        .bind(subscription.retry_count)
        .bind(subscription.next_retry_at)
        .bind(subscription.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn find_by_id(&self, club_id: &str, id: &str) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE club_id = ? AND id = ?")
            .bind(club_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, subscription: &Subscription) -> Result<Subscription, AppError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = ?, current_period_end = ?, payment_method_ref = ?, retry_count = ?, next_retry_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&subscription.status)
        .bind(subscription.current_period_end)
        .bind(&subscription.payment_method_ref)
        .bind(subscription.retry_count)
        .bind(subscription.next_retry_at)
        .bind(&subscription.id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn find_due(&self, now: DateTime<Utc>, limit: i32) -> Result<Vec<Subscription>, AppError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE (status = 'ACTIVE' AND current_period_end <= ? AND (next_retry_at IS NULL OR next_retry_at <= ?))
               OR (status = 'PAST_DUE' AND next_retry_at IS NOT NULL AND next_retry_at <= ?)
            ORDER BY current_period_end ASC
            LIMIT ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn add_payment_method(&self, method: &PaymentMethod) -> Result<(), AppError> {
        sqlx::query("INSERT INTO payment_methods (principal_id, method_ref, created_at) VALUES (?, ?, ?)")
            .bind(&method.principal_id)
            .bind(&method.method_ref)
            .bind(method.created_at)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn remove_payment_method(&self, principal_id: &str, method_ref: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let referenced = sqlx::query(
            "SELECT COUNT(*) as count FROM subscriptions WHERE principal_id = ? AND payment_method_ref = ? AND status != 'CANCELED'",
        )
        .bind(principal_id)
        .bind(method_ref)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .get::<i64, _>("count");

        if referenced > 0 {
            return Err(AppError::Conflict(
                "Payment method is used by an active subscription".to_string(),
            ));
        }

        let deleted = sqlx::query("DELETE FROM payment_methods WHERE principal_id = ? AND method_ref = ?")
            .bind(principal_id)
            .bind(method_ref)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Payment method not found".into()));
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn list_payment_methods(&self, principal_id: &str) -> Result<Vec<PaymentMethod>, AppError> {
        sqlx::query_as::<_, PaymentMethod>(
            "SELECT * FROM payment_methods WHERE principal_id = ? ORDER BY created_at ASC",
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }
}
