use crate::domain::{models::club::Club, ports::ClubRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresClubRepo {
    pool: PgPool,
}

impl PostgresClubRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClubRepository for PostgresClubRepo {
    async fn create(&self, club: &Club) -> Result<Club, AppError> {
        sqlx::query_as::<_, Club>(
            "INSERT INTO clubs (id, slug, name, timezone, currency, booking_prefix, booking_seq, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(&club.id)
        .bind(&club.slug)
        .bind(&club.name)
        .bind(&club.timezone)
        .bind(&club.currency)
        .bind(&club.booking_prefix)
        .bind(club.booking_seq)
        .bind(club.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Club>, AppError> {
        sqlx::query_as::<_, Club>("SELECT * FROM clubs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Club>, AppError> {
        sqlx::query_as::<_, Club>("SELECT * FROM clubs WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
