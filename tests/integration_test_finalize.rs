mod common;

use axum::http::StatusCode;
use common::{parse_body, slot, TestApp};
use matchpoint_backend::domain::ports::HoldRepository;

#[tokio::test]
async fn test_double_finalize_returns_same_booking_once() {
    let app = TestApp::new().await;
    let club_id = app.create_club("idempotent").await;
    let resource_id = app.create_resource(&club_id).await;
    let (start, end) = slot(4, 10);

    let res = app.reserve(&club_id, &resource_id, start, end, 45000, "user-a").await;
    let hold_id = parse_body(res).await["hold_id"].as_str().unwrap().to_string();

    let intent = app.gateway.intent_for_hold(&hold_id);
    app.gateway.mark_succeeded(&intent.id);

    let first = parse_body(app.confirm(&club_id, &hold_id, &intent.id, "user-a").await).await;
    let second = parse_body(app.confirm(&club_id, &hold_id, &intent.id, "user-a").await).await;

    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["booking_number"], second["booking_number"]);
    assert_eq!(app.booking_count().await, 1, "duplicate finalize must not insert a second row");
}

#[tokio::test]
async fn test_finalize_rejects_pending_intent() {
    let app = TestApp::new().await;
    let club_id = app.create_club("pending").await;
    let resource_id = app.create_resource(&club_id).await;
    let (start, end) = slot(4, 11);

    let res = app.reserve(&club_id, &resource_id, start, end, 45000, "user-a").await;
    let hold_id = parse_body(res).await["hold_id"].as_str().unwrap().to_string();

    // The mock mints intents in "processing"; nobody marked it succeeded.
    let intent = app.gateway.intent_for_hold(&hold_id);
    let res = app.confirm(&club_id, &hold_id, &intent.id, "user-a").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // The attempt is still alive; a later confirm succeeds.
    app.gateway.mark_succeeded(&intent.id);
    let res = app.confirm(&club_id, &hold_id, &intent.id, "user-a").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_verification_timeout_preserves_the_hold() {
    let app = TestApp::new().await;
    let club_id = app.create_club("timeout").await;
    let resource_id = app.create_resource(&club_id).await;
    let (start, end) = slot(4, 12);

    let res = app.reserve(&club_id, &resource_id, start, end, 45000, "user-a").await;
    let hold_id = parse_body(res).await["hold_id"].as_str().unwrap().to_string();
    let intent = app.gateway.intent_for_hold(&hold_id);
    app.gateway.mark_succeeded(&intent.id);

    // Timeout means "unknown": the hold must not be released.
    app.gateway.set_retrieve_timeout(true);
    let res = app.confirm(&club_id, &hold_id, &intent.id, "user-a").await;
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(app.hold_status(&hold_id).await, "AWAITING_PAYMENT");

    // Retry once the provider answers again.
    app.gateway.set_retrieve_timeout(false);
    let res = app.confirm(&club_id, &hold_id, &intent.id, "user-a").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_finalize_rejects_foreign_intent() {
    let app = TestApp::new().await;
    let club_id = app.create_club("foreign").await;
    let resource_id = app.create_resource(&club_id).await;

    let (start_a, end_a) = slot(4, 9);
    let res = app.reserve(&club_id, &resource_id, start_a, end_a, 45000, "user-a").await;
    let hold_a = parse_body(res).await["hold_id"].as_str().unwrap().to_string();

    let (start_b, end_b) = slot(4, 14);
    let res = app.reserve(&club_id, &resource_id, start_b, end_b, 30000, "user-b").await;
    let hold_b = parse_body(res).await["hold_id"].as_str().unwrap().to_string();

    // B's intent against A's hold: a client cannot graft a cheaper
    // payment onto a different reservation.
    let intent_b = app.gateway.intent_for_hold(&hold_b);
    app.gateway.mark_succeeded(&intent_b.id);
    let res = app.confirm(&club_id, &hold_a, &intent_b.id, "user-a").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.booking_count().await, 0);
}

#[tokio::test]
async fn test_expired_hold_finalize_refunds_stale_intent() {
    let app = TestApp::new().await;
    let club_id = app.create_club("stale").await;
    let resource_id = app.create_resource(&club_id).await;
    let (start, end) = slot(4, 15);

    let res = app.reserve(&club_id, &resource_id, start, end, 45000, "user-a").await;
    let hold_id = parse_body(res).await["hold_id"].as_str().unwrap().to_string();
    let intent = app.gateway.intent_for_hold(&hold_id);
    app.gateway.mark_succeeded(&intent.id);

    // Payment completed only after the TTL lapsed.
    app.force_expire_hold(&hold_id).await;

    let res = app.confirm(&club_id, &hold_id, &intent.id, "user-a").await;
    assert_eq!(res.status(), StatusCode::GONE);
    assert_eq!(app.booking_count().await, 0);
    let refunds = app.gateway.refunds.lock().unwrap().clone();
    assert_eq!(refunds, vec![(intent.id.clone(), 45000)]);
}

#[tokio::test]
async fn test_sweep_expiry_loses_to_earlier_finalize() {
    let app = TestApp::new().await;
    let club_id = app.create_club("race").await;
    let resource_id = app.create_resource(&club_id).await;
    let (start, end) = slot(4, 17);

    let res = app.reserve(&club_id, &resource_id, start, end, 45000, "user-a").await;
    let hold_id = parse_body(res).await["hold_id"].as_str().unwrap().to_string();
    let intent = app.gateway.intent_for_hold(&hold_id);
    app.gateway.mark_succeeded(&intent.id);

    let res = app.confirm(&club_id, &hold_id, &intent.id, "user-a").await;
    assert_eq!(res.status(), StatusCode::OK);

    // A late expiry against the settled hold is a no-op: the claim was
    // already taken by the finalize.
    let hold = app
        .state
        .hold_repo
        .find_by_id(&club_id, &hold_id)
        .await
        .unwrap()
        .unwrap();
    let mut stale = hold.clone();
    stale.status = "AWAITING_PAYMENT".to_string();
    stale.version = 0;
    stale.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
    let won = app.state.reservations.expire(&stale).await.unwrap();
    assert!(!won);
    assert_eq!(app.hold_status(&hold_id).await, "CONFIRMED");
    assert_eq!(app.booking_count().await, 1);
}
