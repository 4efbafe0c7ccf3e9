//! Account, session and admin integration tests.

mod common;

use axum::http::StatusCode;
use common::{checkout_body, TestHarness, ADMIN_EMAIL, PASSWORD};
use serde_json::{json, Value};

// ============================================================================
// Customers
// ============================================================================

#[tokio::test]
async fn register_then_login_then_verify() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/auth/register")
        .json(&json!({ "name": "Emeka", "email": "emeka@example.com", "password": "pw12345" }))
        .await;
    response.assert_status_ok();

    let registered: Value = response.json();
    assert_eq!(registered["user"]["role"], "user");
    assert!(registered["token"].as_str().is_some_and(|t| !t.is_empty()));

    let response = harness
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "emeka@example.com", "password": "pw12345" }))
        .await;
    response.assert_status_ok();
    let session: Value = response.json();
    let token = session["token"].as_str().unwrap();

    let response = harness
        .server
        .get("/api/auth/verify")
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    response.assert_status_ok();

    let user: Value = response.json();
    assert_eq!(user["email"], "emeka@example.com");
    assert_eq!(user["name"], "Emeka");
}

#[tokio::test]
async fn register_requires_all_fields_and_a_fresh_email() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/auth/register")
        .json(&json!({ "name": "", "email": "x@example.com", "password": "pw" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["error"]["message"], "All fields are required");

    let response = harness
        .server
        .post("/api/auth/register")
        .json(&json!({ "name": "Ada", "email": "ada@example.com", "password": "pw" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["error"]["message"], "User already exists");
}

#[tokio::test]
async fn login_distinguishes_unknown_user_from_wrong_password() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ada@example.com", "password": "wrong" }))
        .await;
    response.assert_status_unauthorized();
    let error: Value = response.json();
    assert_eq!(error["error"]["message"], "Invalid credentials");
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let harness = TestHarness::new().await;
    let token = format!("{}x", harness.customer_auth());

    let response = harness
        .server
        .get("/api/auth/verify")
        .add_header("authorization", token)
        .await;
    response.assert_status_unauthorized();

    let error: Value = response.json();
    assert_eq!(error["error"]["message"], "Invalid or expired token");
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
async fn admin_login_requires_admin_role() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/admin/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["role"], "admin");

    let token = body["token"].as_str().unwrap();
    let verified: Value = harness
        .server
        .get("/api/admin/verify")
        .add_header("authorization", format!("Bearer {token}"))
        .await
        .json();
    assert_eq!(verified["valid"], true);

    let response = harness
        .server
        .post("/api/admin/login")
        .json(&json!({ "email": "ada@example.com", "password": PASSWORD }))
        .await;
    response.assert_status_unauthorized();
    let error: Value = response.json();
    assert_eq!(error["error"]["message"], "Invalid email or password");
}

#[tokio::test]
async fn dashboard_counts_and_recent_orders() {
    let harness = TestHarness::new().await;

    for path in ["/api/orders", "/api/orders/whatsapp-order"] {
        harness
            .server
            .post(path)
            .add_header("authorization", harness.customer_auth())
            .json(&checkout_body(None))
            .await
            .assert_status(StatusCode::CREATED);
    }
    harness
        .server
        .post("/api/subscribe")
        .json(&json!({ "email": "chidi@example.com" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/api/admin/dashboard")
        .add_header("authorization", harness.admin_auth())
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["totalOrders"], 2);
    // The assisted order starts awaiting contact, not pending.
    assert_eq!(body["pendingOrders"], 1);
    assert_eq!(body["totalBatches"], 0);
    assert!(body["totalSubscribers"].as_u64().unwrap() >= 1);
    assert_eq!(body["recentOrders"].as_array().unwrap().len(), 2);
}
