use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};

use crate::domain::models::webhook_event::RETENTION_DAYS;
use crate::state::AppState;

const SWEEP_INTERVAL_SECS: u64 = 15;
const EXPIRY_BATCH: i32 = 50;

/// Reclaims lapsed holds, drives the recurring billing cycle, and trims
/// the webhook dedup ledger. Expiry is advisory for reads (the
/// availability queries check `expires_at` themselves); the sweep is what
/// moves the rows to their terminal state and cancels dangling intents.
pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting reservation sweep worker...");

    loop {
        sweep_expired_holds(&state).await;
        run_billing(&state).await;
        purge_webhook_ledger(&state).await;

        sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
    }
}

async fn sweep_expired_holds(state: &Arc<AppState>) {
    let now = Utc::now();
    match state.hold_repo.find_expired(now, EXPIRY_BATCH).await {
        Ok(holds) => {
            for hold in holds {
                let span = info_span!(
                    "hold_expiry",
                    hold_id = %hold.id,
                    resource_id = %hold.resource_id,
                    club_id = %hold.club_id
                );

                async {
                    match state.reservations.expire(&hold).await {
                        Ok(true) => info!("Hold reclaimed"),
                        // A concurrent finalize won the claim; nothing to do.
                        Ok(false) => {}
                        Err(e) => error!("Hold expiry failed: {:?}", e),
                    }
                }
                .instrument(span)
                .await;
            }
        }
        Err(e) => error!("Failed to fetch expired holds: {:?}", e),
    }
}

async fn run_billing(state: &Arc<AppState>) {
    match state.billing.run_cycle(Utc::now()).await {
        Ok(0) => {}
        Ok(processed) => info!("Billing cycle processed {} subscriptions", processed),
        Err(e) => error!("Billing cycle failed: {:?}", e),
    }
}

async fn purge_webhook_ledger(state: &Arc<AppState>) {
    let cutoff = Utc::now() - chrono::Duration::days(RETENTION_DAYS);
    match state.webhook_repo.purge_older_than(cutoff).await {
        Ok(0) => {}
        Ok(purged) => info!("Purged {} webhook events past retention", purged),
        Err(e) => error!("Webhook ledger purge failed: {:?}", e),
    }
}
