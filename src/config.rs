use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub payment_api_url: String,
    pub payment_api_key: String,
    pub payment_webhook_secret: String,
    pub payment_timeout_ms: u64,
    pub webhook_tolerance_secs: i64,
    pub hold_ttl_minutes: i64,
    pub mail_service_url: String,
    pub mail_service_token: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            payment_api_url: env::var("PAYMENT_API_URL").expect("PAYMENT_API_URL must be set"),
            payment_api_key: env::var("PAYMENT_API_KEY").expect("PAYMENT_API_KEY must be set"),
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET").expect("PAYMENT_WEBHOOK_SECRET must be set"),
            payment_timeout_ms: env::var("PAYMENT_TIMEOUT_MS").unwrap_or_else(|_| "15000".to_string()).parse().expect("PAYMENT_TIMEOUT_MS must be a number"),
            webhook_tolerance_secs: env::var("WEBHOOK_TOLERANCE_SECS").unwrap_or_else(|_| "300".to_string()).parse().expect("WEBHOOK_TOLERANCE_SECS must be a number"),
            hold_ttl_minutes: env::var("HOLD_TTL_MINUTES").unwrap_or_else(|_| "10".to_string()).parse().expect("HOLD_TTL_MINUTES must be a number"),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
        }
    }
}
