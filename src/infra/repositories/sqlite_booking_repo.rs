use crate::domain::models::booking::{format_booking_number, Booking};
use crate::domain::models::club::Club;
use crate::domain::models::hold::Hold;
use crate::domain::ports::BookingRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn confirm(
        &self,
        club: &Club,
        hold: &Hold,
        payment_intent_id: &str,
    ) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // The claim is the serialization point: losing it means a
        // concurrent finalize or expiry settled this hold first.
        let claimed = sqlx::query(
            "UPDATE holds SET status = 'CONFIRMED', version = version + 1 WHERE id = ? AND status = 'AWAITING_PAYMENT' AND version = ?",
        )
        .bind(&hold.id)
        .bind(hold.version)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if claimed.rows_affected() == 0 {
            return Err(AppError::Conflict("Hold already claimed".to_string()));
        }

        // Booking number is issued here and nowhere else, so unpaid
        // attempts never consume a sequence value.
        let seq = sqlx::query("UPDATE clubs SET booking_seq = booking_seq + 1 WHERE id = ? RETURNING booking_seq")
            .bind(&club.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .get::<i64, _>("booking_seq");

        let booking = Booking::from_hold(
            hold,
            payment_intent_id.to_string(),
            format_booking_number(&club.booking_prefix, seq),
        );

        let created = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (id, club_id, resource_id, hold_id, principal_id, start_time, end_time,
                                  price_minor, currency, payment_intent_id, status, booking_number, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.club_id)
        .bind(&booking.resource_id)
        .bind(&booking.hold_id)
        .bind(&booking.principal_id)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.price_minor)
        .bind(&booking.currency)
        .bind(&booking.payment_intent_id)
        .bind(&booking.status)
        .bind(&booking.booking_number)
        .bind(booking.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, club_id: &str, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE club_id = ? AND id = ?")
            .bind(club_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_hold(&self, hold_id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE hold_id = ?")
            .bind(hold_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_club(&self, club_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE club_id = ? ORDER BY start_time ASC")
            .bind(club_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_confirmed_in_range(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE resource_id = ? AND status = 'CONFIRMED' AND start_time < ? AND end_time > ?",
        )
        .bind(resource_id)
        .bind(end)
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn set_status(&self, club_id: &str, id: &str, status: &str) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = ? WHERE club_id = ? AND id = ? RETURNING *",
        )
        .bind(status)
        .bind(club_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::NotFound("Booking not found".into()))
    }
}
