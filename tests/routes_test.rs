mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{bearer_for, premium_subscription, TestServer, TEST_APP_URL};
use http_body_util::BodyExt;
use premium_ledger::db::subscriptiondb::SubscriptionExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, user_id: Uuid) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, bearer_for(user_id))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, user_id: Option<Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header(header::AUTHORIZATION, bearer_for(user_id));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_check_works() {
    let server = TestServer::spawn();

    let request = Request::builder()
        .uri("/api/healthchecker")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&server.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let server = TestServer::spawn();

    let request = Request::builder()
        .uri("/api/referral/code")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&server.router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "fail");

    let request = Request::builder()
        .uri("/api/subscription")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&server.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn referral_code_comes_with_a_share_link() {
    let server = TestServer::spawn();
    let user_id = Uuid::new_v4();

    let (status, body) = send(&server.router, get("/api/referral/code", user_id)).await;

    assert_eq!(status, StatusCode::OK);
    let code = body["data"]["referral_code"]["code"].as_str().unwrap().to_string();
    assert_eq!(
        body["data"]["referral_link"],
        format!("{}/signup?ref={}", TEST_APP_URL, code)
    );
}

#[tokio::test]
async fn validate_is_public() {
    let server = TestServer::spawn();
    let (_, body) = send(&server.router, get("/api/referral/code", Uuid::new_v4())).await;
    let code = body["data"]["referral_code"]["code"].as_str().unwrap().to_lowercase();

    let (status, body) = send(
        &server.router,
        post_json("/api/referral/validate", None, json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);

    let (_, body) = send(
        &server.router,
        post_json("/api/referral/validate", None, json!({ "code": "NOPE2345" })),
    )
    .await;
    assert_eq!(body["data"]["valid"], false);
}

#[tokio::test]
async fn referral_flow_over_http() {
    let server = TestServer::spawn();
    let referrer_id = Uuid::new_v4();
    let referred_id = Uuid::new_v4();

    let (_, body) = send(&server.router, get("/api/referral/code", referrer_id)).await;
    let code = body["data"]["referral_code"]["code"].as_str().unwrap().to_string();

    let (status, body) = send(
        &server.router,
        post_json("/api/referral/record", Some(referrer_id), json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["code"], "self_referral");
    assert_eq!(body["message"], "You cannot refer yourself");

    let (status, _) = send(
        &server.router,
        post_json("/api/referral/record", Some(referred_id), json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &server.router,
        post_json("/api/referral/record", Some(referred_id), json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "already_referred");

    let (status, body) = send(
        &server.router,
        post_json("/api/referral/complete", Some(referred_id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], true);
    assert_eq!(body["data"]["referred_bonus_days"], 7);

    let (_, body) = send(
        &server.router,
        post_json("/api/referral/complete", Some(referred_id), json!({})),
    )
    .await;
    assert_eq!(body["data"]["completed"], false);
    assert_eq!(body["data"]["reason"], "no_pending_referral");

    let (_, body) = send(&server.router, get("/api/referral/stats", referrer_id)).await;
    assert_eq!(body["data"]["stats"]["total_converted"], 1);
    assert_eq!(body["data"]["premium_credits"]["has_credits"], true);

    let (_, body) = send(&server.router, get("/api/referral/status", referred_id)).await;
    assert_eq!(body["data"]["was_referred"], true);
    assert_eq!(body["data"]["status"], "completed");

    let (_, body) = send(&server.router, get("/api/subscription", referred_id)).await;
    assert_eq!(body["data"]["plan"], "premium");
    assert_eq!(body["data"]["status"], "credit");
}

#[tokio::test]
async fn check_reports_denial_in_camel_case() {
    let server = TestServer::spawn();
    let user_id = Uuid::new_v4();

    for _ in 0..3 {
        let (status, _) = send(
            &server.router,
            post_json("/api/subscription/usage", Some(user_id), json!({ "action": "create_meal_plan" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &server.router,
        post_json("/api/subscription/check", Some(user_id), json!({ "action": "create_meal_plan" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["limit"], 3);
    assert_eq!(body["used"], 3);
    assert_eq!(body["upgradePath"], "/pricing");

    server
        .store
        .upsert_subscription(&premium_subscription(user_id, "active"))
        .await
        .unwrap();
    let (_, body) = send(
        &server.router,
        post_json("/api/subscription/check", Some(user_id), json!({ "action": "create_meal_plan" })),
    )
    .await;
    assert_eq!(body, json!({ "allowed": true }));
}

#[tokio::test]
async fn unknown_actions_are_allowed_and_not_counted() {
    let server = TestServer::spawn();
    let user_id = Uuid::new_v4();

    let (status, body) = send(
        &server.router,
        post_json("/api/subscription/check", Some(user_id), json!({ "action": "plan_a_party" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);

    let (status, _) = send(
        &server.router,
        post_json("/api/subscription/usage", Some(user_id), json!({ "action": "plan_a_party" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
