//! Integration tests for the sx-progress HTTP API
//!
//! Requests go straight into the router with `oneshot`; no socket is bound.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::Fixture;
use serde_json::{json, Value};
use sx_progress::api::USER_ID_HEADER;
use sx_progress::{build_router, AppState};
use tower::util::ServiceExt; // for `oneshot` method

fn setup_app(fx: &Fixture) -> axum::Router {
    build_router(AppState::new(fx.pool.clone()))
}

fn request(method: &str, uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, user: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health_endpoint_needs_no_identity() {
    let fx = Fixture::new().await;
    let app = setup_app(&fx);

    let response = app.oneshot(request("GET", "/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "sx-progress");
    assert!(body["version"].is_string());
    assert!(body["build"].is_string());
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let fx = Fixture::new().await;
    let app = setup_app(&fx);

    let response = app
        .oneshot(request("POST", "/api/hearts/refill", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_blank_identity_is_unauthorized() {
    let fx = Fixture::new().await;
    let app = setup_app(&fx);

    let response = app
        .oneshot(request("GET", "/api/progress", Some("  ")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_activate_and_complete() {
    let fx = Fixture::new().await;
    let challenge = fx.challenges(fx.spanish).await[0];

    let response = setup_app(&fx)
        .oneshot(json_request("POST", "/api/users", "eve", json!({ "name": "Eve" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["hearts"], 5);

    let response = setup_app(&fx)
        .oneshot(request(
            "POST",
            &format!("/api/courses/{}/activate", fx.spanish),
            Some("eve"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["created"], true);
    assert_eq!(body["enrollment"]["status"], "ACTIVE");

    let response = setup_app(&fx)
        .oneshot(request(
            "POST",
            &format!("/api/challenges/{}/complete", challenge),
            Some("eve"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "applied");
    assert_eq!(body["practice"], false);
    assert_eq!(body["course_points"], 10);
}

#[tokio::test]
async fn test_refusal_is_ok_with_reason() {
    let fx = Fixture::new().await;
    let caller = fx.learner("ana").await;
    fx.set_balances(&caller, 5, 100).await;

    let response = setup_app(&fx)
        .oneshot(request("POST", "/api/hearts/refill", Some("ana")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body,
        json!({ "status": "refused", "reason": "hearts_already_full" })
    );
}

#[tokio::test]
async fn test_miss_without_enrollment_is_unprocessable() {
    let fx = Fixture::new().await;
    fx.user("ana").await;
    let challenge = fx.challenges(fx.spanish).await[0];

    let response = setup_app(&fx)
        .oneshot(request(
            "POST",
            &format!("/api/challenges/{}/miss", challenge),
            Some("ana"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NO_ACTIVE_ENROLLMENT");
}

#[tokio::test]
async fn test_unknown_challenge_is_not_found() {
    let fx = Fixture::new().await;
    fx.learner("ana").await;

    let response = setup_app(&fx)
        .oneshot(request("POST", "/api/challenges/9999/complete", Some("ana")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscription_update_reports_entitlement() {
    let fx = Fixture::new().await;
    fx.learner("ana").await;

    let response = setup_app(&fx)
        .oneshot(json_request(
            "PUT",
            "/api/subscription",
            "ana",
            json!({ "tier": "PRO", "customer_id": "cus_1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["active"], true);
    assert_eq!(body["subscription"]["tier"], "PRO");

    let response = setup_app(&fx)
        .oneshot(request("GET", "/api/progress", Some("ana")))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["subscription_active"], true);
    assert_eq!(body["active_course"]["title"], "Spanish");
}

#[tokio::test]
async fn test_leaderboard_limit() {
    let fx = Fixture::new().await;
    for id in ["ana", "ben", "cleo"] {
        fx.user(id).await;
    }

    let response = setup_app(&fx)
        .oneshot(request("GET", "/api/leaderboard?limit=2", Some("ana")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    assert_eq!(body[0]["rank"], 1);
}
