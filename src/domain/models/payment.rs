use serde::{Deserialize, Serialize};

pub mod intent_status {
    pub const REQUIRES_ACTION: &str = "requires_action";
    pub const PROCESSING: &str = "processing";
    pub const SUCCEEDED: &str = "succeeded";
    pub const FAILED: &str = "failed";
    pub const CANCELED: &str = "canceled";
}

/// Provider-side transaction reference. Amounts are minor currency units
/// end to end; nothing in the money path ever touches floating point.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(rename = "amount")]
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub client_secret: Option<String>,
}

/// Decimal rendering for presentation surfaces (responses, emails).
/// Everywhere else money stays an integral minor-unit amount.
pub fn format_minor_units(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
