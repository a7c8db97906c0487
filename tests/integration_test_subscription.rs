mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{parse_body, TestApp};
use serde_json::json;
use tower::ServiceExt;

async fn add_method(app: &TestApp, principal: &str, method_ref: &str) -> StatusCode {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/payment-methods")
                .header(header::CONTENT_TYPE, "application/json")
                .header("X-Principal-Id", principal)
                .body(Body::from(json!({ "method_ref": method_ref }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

async fn remove_method(app: &TestApp, principal: &str, method_ref: &str) -> StatusCode {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/payment-methods/{}", method_ref))
                .header("X-Principal-Id", principal)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

async fn subscribe(
    app: &TestApp,
    club_id: &str,
    principal: &str,
    method_ref: &str,
) -> axum::response::Response {
    let payload = json!({
        "plan_code": "monthly-court",
        "amount_minor": 2900,
        "period_days": 30,
        "payment_method_ref": method_ref
    });

    app.router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/{}/subscriptions", club_id))
                .header(header::CONTENT_TYPE, "application/json")
                .header("X-Principal-Id", principal)
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn cancel(
    app: &TestApp,
    club_id: &str,
    subscription_id: &str,
    principal: &str,
    confirmation: &str,
) -> axum::response::Response {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/{}/subscriptions/{}/cancel", club_id, subscription_id))
                .header(header::CONTENT_TYPE, "application/json")
                .header("X-Principal-Id", principal)
                .body(Body::from(json!({ "confirmation": confirmation }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn make_due(app: &TestApp, subscription_id: &str) {
    sqlx::query("UPDATE subscriptions SET current_period_end = ?, next_retry_at = NULL WHERE id = ?")
        .bind(Utc::now() - Duration::minutes(1))
        .bind(subscription_id)
        .execute(&app.pool)
        .await
        .unwrap();
}

async fn make_retry_due(app: &TestApp, subscription_id: &str) {
    sqlx::query("UPDATE subscriptions SET next_retry_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::minutes(1))
        .bind(subscription_id)
        .execute(&app.pool)
        .await
        .unwrap();
}

async fn sub_row(app: &TestApp, subscription_id: &str) -> (String, i32) {
    sqlx::query_as::<_, (String, i32)>("SELECT status, retry_count FROM subscriptions WHERE id = ?")
        .bind(subscription_id)
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_subscription_requires_stored_method() {
    let app = TestApp::new().await;
    let club_id = app.create_club("sub-method").await;

    let res = subscribe(&app, &club_id, "user-a", "pm_missing").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(add_method(&app, "user-a", "pm_card").await, StatusCode::OK);
    let res = subscribe(&app, &club_id, "user-a", "pm_card").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["status"].as_str().unwrap(), "ACTIVE");
}

#[tokio::test]
async fn test_successful_cycle_extends_period() {
    let app = TestApp::new().await;
    let club_id = app.create_club("sub-extend").await;
    add_method(&app, "user-a", "pm_card").await;

    let sub = parse_body(subscribe(&app, &club_id, "user-a", "pm_card").await).await;
    let sub_id = sub["id"].as_str().unwrap().to_string();

    make_due(&app, &sub_id).await;
    let processed = app.state.billing.run_cycle(Utc::now()).await.unwrap();
    assert_eq!(processed, 1);

    let (status, retries) = sub_row(&app, &sub_id).await;
    assert_eq!(status, "ACTIVE");
    assert_eq!(retries, 0);

    let period_end: chrono::DateTime<Utc> =
        sqlx::query_scalar("SELECT current_period_end FROM subscriptions WHERE id = ?")
            .bind(&sub_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert!(period_end > Utc::now() + Duration::days(29), "period must extend a full cycle");
}

#[tokio::test]
async fn test_failed_charges_walk_dunning_to_cancellation() {
    let app = TestApp::new().await;
    let club_id = app.create_club("sub-dunning").await;
    add_method(&app, "user-a", "pm_fail_card").await;

    let sub = parse_body(subscribe(&app, &club_id, "user-a", "pm_fail_card").await).await;
    let sub_id = sub["id"].as_str().unwrap().to_string();

    // Initial charge fails: PAST_DUE with a scheduled retry.
    make_due(&app, &sub_id).await;
    app.state.billing.run_cycle(Utc::now()).await.unwrap();
    let (status, retries) = sub_row(&app, &sub_id).await;
    assert_eq!((status.as_str(), retries), ("PAST_DUE", 1));

    // Three retries across the week, all failing.
    for expected_retries in 2..=3 {
        make_retry_due(&app, &sub_id).await;
        app.state.billing.run_cycle(Utc::now()).await.unwrap();
        let (status, retries) = sub_row(&app, &sub_id).await;
        assert_eq!((status.as_str(), retries), ("PAST_DUE", expected_retries));
    }

    make_retry_due(&app, &sub_id).await;
    app.state.billing.run_cycle(Utc::now()).await.unwrap();
    let (status, _) = sub_row(&app, &sub_id).await;
    assert_eq!(status, "CANCELED");
}

#[tokio::test]
async fn test_recovered_charge_resets_dunning() {
    let app = TestApp::new().await;
    let club_id = app.create_club("sub-recover").await;
    add_method(&app, "user-a", "pm_fail_then_ok").await;

    let sub = parse_body(subscribe(&app, &club_id, "user-a", "pm_fail_then_ok").await).await;
    let sub_id = sub["id"].as_str().unwrap().to_string();

    make_due(&app, &sub_id).await;
    app.state.billing.run_cycle(Utc::now()).await.unwrap();
    let (status, _) = sub_row(&app, &sub_id).await;
    assert_eq!(status, "PAST_DUE");

    // The card starts working again.
    sqlx::query("UPDATE subscriptions SET payment_method_ref = 'pm_recovered' WHERE id = ?")
        .bind(&sub_id)
        .execute(&app.pool)
        .await
        .unwrap();

    make_retry_due(&app, &sub_id).await;
    app.state.billing.run_cycle(Utc::now()).await.unwrap();
    let (status, retries) = sub_row(&app, &sub_id).await;
    assert_eq!((status.as_str(), retries), ("ACTIVE", 0));
}

#[tokio::test]
async fn test_cancel_requires_matching_confirmation_phrase() {
    let app = TestApp::new().await;
    let club_id = app.create_club("sub-cancel").await;
    add_method(&app, "user-a", "pm_card").await;

    let sub = parse_body(subscribe(&app, &club_id, "user-a", "pm_card").await).await;
    let sub_id = sub["id"].as_str().unwrap().to_string();

    let res = cancel(&app, &club_id, &sub_id, "user-a", "wrong-phrase").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let (status, _) = sub_row(&app, &sub_id).await;
    assert_eq!(status, "ACTIVE");

    // Another principal cannot cancel even with the right phrase.
    let res = cancel(&app, &club_id, &sub_id, "user-b", "monthly-court").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = cancel(&app, &club_id, &sub_id, "user-a", "monthly-court").await;
    assert_eq!(res.status(), StatusCode::OK);
    let (status, _) = sub_row(&app, &sub_id).await;
    assert_eq!(status, "CANCELED");

    // Idempotent on repeat.
    let res = cancel(&app, &club_id, &sub_id, "user-a", "monthly-court").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_method_backing_live_subscription_cannot_be_removed() {
    let app = TestApp::new().await;
    let club_id = app.create_club("sub-method-del").await;
    add_method(&app, "user-a", "pm_card").await;

    let sub = parse_body(subscribe(&app, &club_id, "user-a", "pm_card").await).await;
    let sub_id = sub["id"].as_str().unwrap().to_string();

    assert_eq!(remove_method(&app, "user-a", "pm_card").await, StatusCode::CONFLICT);

    cancel(&app, &club_id, &sub_id, "user-a", "monthly-court").await;
    assert_eq!(remove_method(&app, "user-a", "pm_card").await, StatusCode::OK);

    // Already gone.
    assert_eq!(remove_method(&app, "user-a", "pm_card").await, StatusCode::NOT_FOUND);
}
