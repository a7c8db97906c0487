use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    ConnectOptions, PgPool, SqlitePool,
};
use tera::Tera;
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::services::billing::BillingService;
use crate::domain::services::reconciler::WebhookReconciler;
use crate::domain::services::reservation::ReservationService;
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::payments::http_gateway::HttpPaymentGateway;
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_club_repo::PostgresClubRepo,
    postgres_hold_repo::PostgresHoldRepo, postgres_resource_repo::PostgresResourceRepo,
    postgres_subscription_repo::PostgresSubscriptionRepo, postgres_webhook_repo::PostgresWebhookRepo,
    sqlite_booking_repo::SqliteBookingRepo, sqlite_club_repo::SqliteClubRepo,
    sqlite_hold_repo::SqliteHoldRepo, sqlite_resource_repo::SqliteResourceRepo,
    sqlite_subscription_repo::SqliteSubscriptionRepo, sqlite_webhook_repo::SqliteWebhookRepo,
};
use crate::state::AppState;

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;

    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));

    let payment_gateway = Arc::new(HttpPaymentGateway::new(
        config.payment_api_url.clone(),
        config.payment_api_key.clone(),
        config.payment_timeout_ms,
    ));

    let mut tera = Tera::default();
    tera.add_raw_template("confirmation.html", include_str!("../templates/confirmation.html"))
        .expect("Failed to load confirmation template");
    let templates = Arc::new(tera);

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        let club_repo = Arc::new(PostgresClubRepo::new(pool.clone()));
        let resource_repo = Arc::new(PostgresResourceRepo::new(pool.clone()));
        let hold_repo = Arc::new(PostgresHoldRepo::new(pool.clone()));
        let booking_repo = Arc::new(PostgresBookingRepo::new(pool.clone()));
        let webhook_repo = Arc::new(PostgresWebhookRepo::new(pool.clone()));
        let subscription_repo = Arc::new(PostgresSubscriptionRepo::new(pool.clone()));

        let reservations = Arc::new(ReservationService::new(
            hold_repo.clone(),
            booking_repo.clone(),
            club_repo.clone(),
            resource_repo.clone(),
            payment_gateway.clone(),
            email_service.clone(),
            templates.clone(),
            ChronoDuration::minutes(config.hold_ttl_minutes),
        ));
        let billing = Arc::new(BillingService::new(
            subscription_repo.clone(),
            payment_gateway.clone(),
        ));
        let reconciler = Arc::new(WebhookReconciler::new(
            config.payment_webhook_secret.clone(),
            config.webhook_tolerance_secs,
            webhook_repo.clone(),
            reservations.clone(),
        ));

        AppState {
            config: config.clone(),
            club_repo,
            resource_repo,
            hold_repo,
            booking_repo,
            webhook_repo,
            subscription_repo,
            payment_gateway,
            email_service,
            reservations,
            billing,
            reconciler,
            templates,
        }
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        let club_repo = Arc::new(SqliteClubRepo::new(pool.clone()));
        let resource_repo = Arc::new(SqliteResourceRepo::new(pool.clone()));
        let hold_repo = Arc::new(SqliteHoldRepo::new(pool.clone()));
        let booking_repo = Arc::new(SqliteBookingRepo::new(pool.clone()));
        let webhook_repo = Arc::new(SqliteWebhookRepo::new(pool.clone()));
        let subscription_repo = Arc::new(SqliteSubscriptionRepo::new(pool.clone()));

        let reservations = Arc::new(ReservationService::new(
            hold_repo.clone(),
            booking_repo.clone(),
            club_repo.clone(),
            resource_repo.clone(),
            payment_gateway.clone(),
            email_service.clone(),
            templates.clone(),
            ChronoDuration::minutes(config.hold_ttl_minutes),
        ));
        let billing = Arc::new(BillingService::new(
            subscription_repo.clone(),
            payment_gateway.clone(),
        ));
        let reconciler = Arc::new(WebhookReconciler::new(
            config.payment_webhook_secret.clone(),
            config.webhook_tolerance_secs,
            webhook_repo.clone(),
            reservations.clone(),
        ));

        AppState {
            config: config.clone(),
            club_repo,
            resource_repo,
            hold_repo,
            booking_repo,
            webhook_repo,
            subscription_repo,
            payment_gateway,
            email_service,
            reservations,
            billing,
            reconciler,
            templates,
        }
    }
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
