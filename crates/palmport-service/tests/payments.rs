//! Payment initialization and verification integration tests.

mod common;

use axum::http::StatusCode;
use common::{checkout_body, TestHarness, ADMIN_EMAIL};
use palmport_core::{Product, ProductFields};
use palmport_store::Store;
use serde_json::{json, Value};

/// Place an online order and script its gateway outcome. Returns the order
/// number, which doubles as the payment reference.
async fn place_online(harness: &TestHarness, gateway_status: &str) -> String {
    let response = harness
        .server
        .post("/api/orders")
        .add_header("authorization", harness.customer_auth())
        .json(&checkout_body(None))
        .await;
    response.assert_status(StatusCode::CREATED);

    let order: Value = response.json();
    let reference = order["order_number"].as_str().unwrap().to_string();
    harness.gateway.set_status(&reference, gateway_status);
    reference
}

async fn fill_cart(harness: &TestHarness) -> Product {
    let product = harness
        .store
        .insert_product(
            ProductFields {
                name: "Red Palm Oil".into(),
                price: 4500,
                size: "5L".into(),
                in_stock: true,
                ..ProductFields::default()
            },
            None,
        )
        .await
        .unwrap();
    harness
        .server
        .post("/api/cart/add")
        .add_header("authorization", harness.customer_auth())
        .json(&json!({ "product_id": product.id, "quantity": 2 }))
        .await
        .assert_status_ok();
    product
}

#[tokio::test]
async fn initialize_requires_fields() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/payments/initialize")
        .json(&json!({ "email": "ada@example.com" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let error: Value = response.json();
    assert_eq!(
        error["error"]["message"],
        "Missing required fields: email, amount, and reference are required"
    );
}

#[tokio::test]
async fn initialize_returns_the_gateway_envelope() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/payments/initialize")
        .json(&json!({ "email": "ada@example.com", "amount": 1550000, "reference": "ref_1" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], true);
    assert_eq!(body["data"]["reference"], "ref_1");
    assert_eq!(body["data"]["authorization_url"], "https://checkout.test/ref_1");
}

#[tokio::test]
async fn initialize_accepts_a_fractional_amount() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/payments/initialize")
        .json(&json!({ "email": "ada@example.com", "amount": 1_550_000.5, "reference": "ref_2" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], true);
    assert_eq!(body["data"]["reference"], "ref_2");
    assert_eq!(harness.gateway.initialized_amounts(), vec![1_550_001]);
}

#[tokio::test]
async fn successful_verification_marks_paid_and_clears_cart() {
    let harness = TestHarness::new().await;
    fill_cart(&harness).await;
    let reference = place_online(&harness, "success").await;

    let response = harness
        .server
        .get(&format!("/api/payments/verify/{reference}"))
        .add_header("authorization", harness.customer_auth())
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Payment verified successfully");
    assert_eq!(body["order"]["payment_status"], "paid");
    assert_eq!(body["order"]["payment_reference"], reference.as_str());
    assert_eq!(body["payment"]["status"], "success");

    let cart: Vec<Value> = harness
        .server
        .get("/api/cart")
        .add_header("authorization", harness.customer_auth())
        .await
        .json();
    assert!(cart.is_empty());

    let receipts: Vec<_> = harness
        .mailer
        .sent()
        .into_iter()
        .filter(|m| m.to == ADMIN_EMAIL && m.subject.starts_with("Payment Received"))
        .collect();
    assert_eq!(receipts.len(), 1);
    assert!(receipts[0].subject.contains("₦15,500"));
}

#[tokio::test]
async fn repeated_verification_is_idempotent() {
    let harness = TestHarness::new().await;
    let reference = place_online(&harness, "success").await;

    for _ in 0..2 {
        let body: Value = harness
            .server
            .get(&format!("/api/payments/verify/{reference}"))
            .add_header("authorization", harness.customer_auth())
            .await
            .json();
        assert_eq!(body["order"]["payment_status"], "paid");
    }

    let receipts = harness
        .mailer
        .sent()
        .into_iter()
        .filter(|m| m.subject.starts_with("Payment Received"))
        .count();
    assert_eq!(receipts, 1);
}

#[tokio::test]
async fn repeated_verification_keeps_a_refilled_cart() {
    let harness = TestHarness::new().await;
    let reference = place_online(&harness, "success").await;
    let verify = || {
        harness
            .server
            .get(&format!("/api/payments/verify/{reference}"))
            .add_header("authorization", harness.customer_auth())
    };

    verify().await.assert_status_ok();
    let product = fill_cart(&harness).await;
    verify().await.assert_status_ok();

    let cart: Vec<Value> = harness
        .server
        .get("/api/cart")
        .add_header("authorization", harness.customer_auth())
        .await
        .json();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0]["product_id"], product.id.to_string());
    assert_eq!(cart[0]["quantity"], 2);
}

#[tokio::test]
async fn failed_payment_leaves_order_pending() {
    let harness = TestHarness::new().await;
    let cart_product = fill_cart(&harness).await;
    let reference = place_online(&harness, "failed").await;

    let response = harness
        .server
        .get(&format!("/api/payments/verify/{reference}"))
        .add_header("authorization", harness.customer_auth())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let error: Value = response.json();
    assert_eq!(error["error"]["code"], "payment_not_confirmed");
    assert_eq!(error["error"]["details"]["status"], "failed");

    let orders: Vec<Value> = harness
        .server
        .get("/api/orders/my-orders")
        .add_header("authorization", harness.customer_auth())
        .await
        .json();
    assert_eq!(orders[0]["payment_status"], "pending");

    let cart: Vec<Value> = harness
        .server
        .get("/api/cart")
        .add_header("authorization", harness.customer_auth())
        .await
        .json();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0]["product_id"], cart_product.id.to_string());
}

#[tokio::test]
async fn verification_of_unknown_order_is_not_found() {
    let harness = TestHarness::new().await;
    harness.gateway.set_status("PALM-1700000000000-00001", "success");

    let response = harness
        .server
        .get("/api/payments/verify/PALM-1700000000000-00001")
        .add_header("authorization", harness.customer_auth())
        .await;
    response.assert_status_not_found();
    assert_eq!(harness.gateway.verifications(), 1);
}

#[tokio::test]
async fn gateway_errors_surface_as_upstream() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .get("/api/payments/verify/never_initialized")
        .add_header("authorization", harness.customer_auth())
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let error: Value = response.json();
    assert_eq!(error["error"]["code"], "upstream_error");
    assert_eq!(error["error"]["message"], "Payment verification failed");
}
