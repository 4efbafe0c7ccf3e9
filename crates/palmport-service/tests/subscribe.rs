//! Mailing list integration tests.

mod common;

use axum::http::StatusCode;
use common::{TestHarness, ADMIN_EMAIL};
use serde_json::{json, Value};

async fn subscribe(harness: &TestHarness, email: &str) -> Value {
    let response = harness
        .server
        .post("/api/subscribe")
        .json(&json!({ "email": email }))
        .await;
    response.assert_status_ok();
    response.json()
}

async fn subscribers(harness: &TestHarness) -> Vec<Value> {
    let response = harness
        .server
        .get("/api/subscribe")
        .add_header("authorization", harness.admin_auth())
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn subscribing_twice_keeps_one_row() {
    let harness = TestHarness::new().await;

    let first = subscribe(&harness, "chidi@example.com").await;
    assert_eq!(first["success"], true);
    assert_eq!(
        first["message"],
        "Subscribed successfully. Confirmation email sent."
    );

    let second = subscribe(&harness, "chidi@example.com").await;
    assert_eq!(second["message"], "Already subscribed.");

    assert_eq!(subscribers(&harness).await.len(), 1);
}

#[tokio::test]
async fn subscribing_sends_confirmation_and_admin_alert() {
    let harness = TestHarness::new().await;
    subscribe(&harness, "chidi@example.com").await;

    let confirmations = harness
        .wait_for_mail(|m| m.to == "chidi@example.com")
        .await;
    assert!(confirmations[0].html.contains("Thank you for subscribing!"));

    harness
        .wait_for_mail(|m| m.to == ADMIN_EMAIL && m.subject == "New Subscriber: chidi@example.com")
        .await;
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/subscribe")
        .json(&json!({ "email": "not-an-email" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let error: Value = response.json();
    assert_eq!(error["error"]["message"], "Invalid email address");
}

#[tokio::test]
async fn mass_mail_reaches_every_subscriber() {
    let harness = TestHarness::new().await;
    subscribe(&harness, "chidi@example.com").await;
    subscribe(&harness, "ngozi@example.com").await;

    let response = harness
        .server
        .post("/api/subscribe/send")
        .add_header("authorization", harness.admin_auth())
        .json(&json!({ "subject": "Harvest update", "message": "<p>New batch in stock</p>" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["message"], "Mass email sent to 2 subscribers.");

    let sent: Vec<_> = harness
        .mailer
        .sent()
        .into_iter()
        .filter(|m| m.subject == "Harvest update")
        .collect();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].html.contains("New batch in stock"));
}

#[tokio::test]
async fn mass_mail_needs_subscribers_and_content() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/subscribe/send")
        .add_header("authorization", harness.admin_auth())
        .json(&json!({ "subject": "Harvest update", "message": "<p>Hi</p>" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .post("/api/subscribe/send")
        .add_header("authorization", harness.admin_auth())
        .json(&json!({ "subject": "", "message": "" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_deletes_subscriber() {
    let harness = TestHarness::new().await;
    subscribe(&harness, "chidi@example.com").await;
    let id = subscribers(&harness).await[0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = harness
        .server
        .delete(&format!("/api/subscribe/{id}"))
        .add_header("authorization", harness.admin_auth())
        .await;
    response.assert_status_ok();
    assert!(subscribers(&harness).await.is_empty());

    harness
        .server
        .delete(&format!("/api/subscribe/{id}"))
        .add_header("authorization", harness.admin_auth())
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn subscriber_list_is_admin_only() {
    let harness = TestHarness::new().await;

    harness
        .server
        .get("/api/subscribe")
        .await
        .assert_status_unauthorized();

    harness
        .server
        .get("/api/subscribe")
        .add_header("authorization", harness.customer_auth())
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
