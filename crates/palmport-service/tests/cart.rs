//! Cart integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use palmport_core::{ProductFields, ProductId};
use palmport_store::Store;
use serde_json::{json, Value};

async fn product(harness: &TestHarness) -> ProductId {
    harness
        .store
        .insert_product(
            ProductFields {
                name: "Red Palm Oil".into(),
                price: 4500,
                in_stock: true,
                ..ProductFields::default()
            },
            None,
        )
        .await
        .unwrap()
        .id
}

async fn cart(harness: &TestHarness) -> Vec<Value> {
    let response = harness
        .server
        .get("/api/cart")
        .add_header("authorization", harness.customer_auth())
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn adding_twice_accumulates_quantity() {
    let harness = TestHarness::new().await;
    let product_id = product(&harness).await;

    let first: Value = harness
        .server
        .post("/api/cart/add")
        .add_header("authorization", harness.customer_auth())
        .json(&json!({ "product_id": product_id, "quantity": 2 }))
        .await
        .json();
    assert_eq!(first["message"], "Item added to cart");

    let second: Value = harness
        .server
        .post("/api/cart/add")
        .add_header("authorization", harness.customer_auth())
        .json(&json!({ "productId": product_id }))
        .await
        .json();
    assert_eq!(second["message"], "Cart updated successfully");

    let items = cart(&harness).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3);
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let harness = TestHarness::new().await;
    let product_id = product(&harness).await;

    let response = harness
        .server
        .post("/api/cart/add")
        .add_header("authorization", harness.customer_auth())
        .json(&json!({ "product_id": product_id, "quantity": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(cart(&harness).await.is_empty());
}

#[tokio::test]
async fn negative_quantity_uses_the_error_envelope() {
    let harness = TestHarness::new().await;
    let product_id = product(&harness).await;

    let response = harness
        .server
        .post("/api/cart/add")
        .add_header("authorization", harness.customer_auth())
        .json(&json!({ "product_id": product_id, "quantity": -1 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let error: Value = response.json();
    assert_eq!(error["error"]["code"], "bad_request");
    assert!(cart(&harness).await.is_empty());
}

#[tokio::test]
async fn remove_is_idempotent() {
    let harness = TestHarness::new().await;
    let product_id = product(&harness).await;

    harness
        .server
        .post("/api/cart/add")
        .add_header("authorization", harness.customer_auth())
        .json(&json!({ "product_id": product_id }))
        .await
        .assert_status_ok();

    for _ in 0..2 {
        let response = harness
            .server
            .delete(&format!("/api/cart/remove/{product_id}"))
            .add_header("authorization", harness.customer_auth())
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["message"], "Item removed from cart");
    }

    assert!(cart(&harness).await.is_empty());
}

#[tokio::test]
async fn carts_are_per_account() {
    let harness = TestHarness::new().await;
    let product_id = product(&harness).await;

    harness
        .server
        .post("/api/cart/add")
        .add_header("authorization", harness.customer_auth())
        .json(&json!({ "product_id": product_id }))
        .await
        .assert_status_ok();

    let admin_cart: Vec<Value> = harness
        .server
        .get("/api/cart")
        .add_header("authorization", harness.admin_auth())
        .await
        .json();
    assert!(admin_cart.is_empty());
}
