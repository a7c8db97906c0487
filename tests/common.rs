use matchpoint_backend::{
    api::router::create_router,
    config::Config,
    domain::models::payment::{intent_status, PaymentIntent},
    domain::ports::{EmailService, PaymentGateway},
    domain::services::{
        billing::BillingService, reconciler::{signature_header, WebhookReconciler},
        reservation::ReservationService,
    },
    error::AppError,
    infra::repositories::{
        sqlite_booking_repo::SqliteBookingRepo, sqlite_club_repo::SqliteClubRepo,
        sqlite_hold_repo::SqliteHoldRepo, sqlite_resource_repo::SqliteResourceRepo,
        sqlite_subscription_repo::SqliteSubscriptionRepo, sqlite_webhook_repo::SqliteWebhookRepo,
    },
    state::AppState,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tera::Tera;
use tower::ServiceExt;
use uuid::Uuid;

#[allow(dead_code)]
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
#[allow(dead_code)]
pub const HOLD_TTL_MINUTES: i64 = 10;

/// In-memory payment provider. Intents are idempotency-keyed like the
/// real one; tests flip their status to script the outcome.
pub struct MockPaymentGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    by_key: Mutex<HashMap<String, String>>,
    pub refunds: Mutex<Vec<(String, i64)>>,
    pub canceled: Mutex<Vec<String>>,
    retrieve_times_out: AtomicBool,
}

#[allow(dead_code)]
impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            intents: Mutex::new(HashMap::new()),
            by_key: Mutex::new(HashMap::new()),
            refunds: Mutex::new(Vec::new()),
            canceled: Mutex::new(Vec::new()),
            retrieve_times_out: AtomicBool::new(false),
        }
    }

    fn mint(&self, amount_minor: i64, currency: &str, idempotency_key: &str, status: &str) -> PaymentIntent {
        if let Some(id) = self.by_key.lock().unwrap().get(idempotency_key) {
            return self.intents.lock().unwrap()[id].clone();
        }

        let id = format!("pi_{}", Uuid::new_v4().simple());
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();

        let intent = PaymentIntent {
            id: id.clone(),
            amount_minor,
            currency: currency.to_string(),
            status: status.to_string(),
            client_secret: Some(format!("{}_secret_{}", id, nonce)),
        };

        self.intents.lock().unwrap().insert(id.clone(), intent.clone());
        self.by_key.lock().unwrap().insert(idempotency_key.to_string(), id);
        intent
    }

    fn set_status(&self, intent_id: &str, status: &str) {
        if let Some(intent) = self.intents.lock().unwrap().get_mut(intent_id) {
            intent.status = status.to_string();
        }
    }

    pub fn mark_succeeded(&self, intent_id: &str) {
        self.set_status(intent_id, intent_status::SUCCEEDED);
    }

    pub fn mark_failed(&self, intent_id: &str) {
        self.set_status(intent_id, intent_status::FAILED);
    }

    pub fn set_retrieve_timeout(&self, times_out: bool) {
        self.retrieve_times_out.store(times_out, Ordering::SeqCst);
    }

    /// The intent minted for a hold, via the hold-derived idempotency key.
    pub fn intent_for_hold(&self, hold_id: &str) -> PaymentIntent {
        let key = format!("hold-{}", hold_id);
        let id = self.by_key.lock().unwrap()[&key].clone();
        self.intents.lock().unwrap()[&id].clone()
    }

    pub fn refund_count(&self) -> usize {
        self.refunds.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, AppError> {
        Ok(self.mint(amount_minor, currency, idempotency_key, intent_status::PROCESSING))
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, AppError> {
        if self.retrieve_times_out.load(Ordering::SeqCst) {
            return Err(AppError::PaymentVerificationTimeout);
        }
        self.intents
            .lock()
            .unwrap()
            .get(intent_id)
            .cloned()
            .ok_or(AppError::NotFound("Unknown intent".into()))
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<(), AppError> {
        self.set_status(intent_id, intent_status::CANCELED);
        self.canceled.lock().unwrap().push(intent_id.to_string());
        Ok(())
    }

    async fn refund(&self, intent_id: &str, amount_minor: i64) -> Result<(), AppError> {
        self.refunds
            .lock()
            .unwrap()
            .push((intent_id.to_string(), amount_minor));
        Ok(())
    }

    async fn charge_saved_method(
        &self,
        amount_minor: i64,
        currency: &str,
        method_ref: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, AppError> {
        let status = if method_ref.contains("fail") {
            intent_status::FAILED
        } else {
            intent_status::SUCCEEDED
        };
        Ok(self.mint(amount_minor, currency, idempotency_key, status))
    }
}

pub struct MockEmailService {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        _html_body: &str,
        _attachment_name: Option<&str>,
        _attachment_data: Option<&[u8]>,
    ) -> Result<(), AppError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), subject.to_string()));
        Ok(())
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub gateway: Arc<MockPaymentGateway>,
    pub outbox: Arc<MockEmailService>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let mut tera = Tera::default();
        tera.add_raw_template(
            "confirmation.html",
            "<html>Booking {{ booking_number }} at {{ club_name }}</html>",
        )
        .unwrap();
        let templates = Arc::new(tera);

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            payment_api_url: "http://localhost".to_string(),
            payment_api_key: "sk_test".to_string(),
            payment_webhook_secret: WEBHOOK_SECRET.to_string(),
            payment_timeout_ms: 1000,
            webhook_tolerance_secs: 300,
            hold_ttl_minutes: HOLD_TTL_MINUTES,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
        };

        let gateway = Arc::new(MockPaymentGateway::new());
        let outbox = Arc::new(MockEmailService::new());

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
            gateway.clone(),
            outbox.clone(),
            templates.clone(),
            ChronoDuration::minutes(config.hold_ttl_minutes),
        ));
        let billing = Arc::new(BillingService::new(subscription_repo.clone(), gateway.clone()));
        let reconciler = Arc::new(WebhookReconciler::new(
            config.payment_webhook_secret.clone(),
            config.webhook_tolerance_secs,
            webhook_repo.clone(),
            reservations.clone(),
        ));

        let state = Arc::new(AppState {
            config,
            club_repo,
            resource_repo,
            hold_repo,
            booking_repo,
            webhook_repo,
            subscription_repo,
            payment_gateway: gateway.clone(),
            email_service: outbox.clone(),
            reservations,
            billing,
            reconciler,
            templates,
        });

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            gateway,
            outbox,
        }
    }

    pub async fn create_club(&self, suffix: &str) -> String {
        let payload = serde_json::json!({
            "slug": format!("club-{}", suffix),
            "name": format!("Test Club {}", suffix),
            "timezone": "UTC",
            "currency": "EUR",
            "booking_prefix": "MAT"
        });

        let res = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/clubs")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(res.status().is_success(), "club creation failed in test helper");
        parse_body(res).await["club_id"].as_str().unwrap().to_string()
    }

    pub async fn create_resource(&self, club_id: &str) -> String {
        let payload = serde_json::json!({
            "resource_type": "COURT",
            "name": "Court 1",
            "open_time": "08:00",
            "close_time": "22:00"
        });

        let res = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/{}/resources", club_id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(res.status().is_success(), "resource creation failed in test helper");
        parse_body(res).await["id"].as_str().unwrap().to_string()
    }

    pub async fn reserve(
        &self,
        club_id: &str,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        price_minor: i64,
        principal: &str,
    ) -> axum::response::Response {
        let payload = serde_json::json!({
            "resource_id": resource_id,
            "start_time": start.to_rfc3339(),
            "end_time": end.to_rfc3339(),
            "price_minor": price_minor
        });

        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/{}/reservations", club_id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("X-Principal-Id", principal)
                    .header("X-Principal-Email", format!("{}@example.com", principal))
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn confirm(
        &self,
        club_id: &str,
        hold_id: &str,
        intent_id: &str,
        principal: &str,
    ) -> axum::response::Response {
        let payload = serde_json::json!({ "payment_intent_id": intent_id });

        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/{}/reservations/{}/confirm", club_id, hold_id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("X-Principal-Id", principal)
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn availability(
        &self,
        club_id: &str,
        resource_id: &str,
        date: &str,
    ) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!(
                        "/api/v1/{}/resources/{}/availability?date={}",
                        club_id, resource_id, date
                    ))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Posts a provider event with a valid signature over the exact body.
    pub async fn post_webhook(&self, body: &Value) -> axum::response::Response {
        let raw = body.to_string();
        let header_value = signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), raw.as_bytes());
        self.post_webhook_signed(raw, header_value).await
    }

    pub async fn post_webhook_signed(
        &self,
        raw_body: String,
        signature: String,
    ) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/payments")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("Payment-Signature", signature)
                    .body(Body::from(raw_body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Rewinds a hold's expiry so lazy-expiry paths can be exercised
    /// without waiting out the TTL.
    pub async fn force_expire_hold(&self, hold_id: &str) {
        sqlx::query("UPDATE holds SET expires_at = ? WHERE id = ?")
            .bind(Utc::now() - ChronoDuration::seconds(1))
            .bind(hold_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn booking_count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn hold_status(&self, hold_id: &str) -> String {
        sqlx::query_scalar::<_, String>("SELECT status FROM holds WHERE id = ?")
            .bind(hold_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

#[allow(dead_code)]
pub async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A minute-granular one-hour slot `days_ahead` days out, inside the
/// 08:00-22:00 test operating window.
#[allow(dead_code)]
pub fn slot(days_ahead: i64, hour: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let date = (Utc::now() + ChronoDuration::days(days_ahead)).date_naive();
    let start = date.and_hms_opt(hour, 0, 0).unwrap().and_utc();
    (start, start + ChronoDuration::hours(1))
}
