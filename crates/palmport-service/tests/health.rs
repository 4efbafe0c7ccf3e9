//! Health endpoint integration tests.

mod common;

use common::TestHarness;
use serde_json::Value;

#[tokio::test]
async fn health_reports_service_and_payments() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "palmport");
    assert_eq!(body["payments"], true);
}
