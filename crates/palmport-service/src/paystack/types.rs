//! Paystack API types.

use serde::{Deserialize, Deserializer, Serialize};

/// Transaction status Paystack reports for a settled payment.
pub const SUCCESS_STATUS: &str = "success";

/// Input for starting a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeTransaction {
    /// Payer email.
    #[serde(default)]
    pub email: String,
    /// Amount in the smallest currency unit (kobo). Fractional input is
    /// rounded to the nearest unit.
    #[serde(default, deserialize_with = "rounded_amount")]
    pub amount: i64,
    /// Our reference; the order number.
    #[serde(default)]
    pub reference: String,
    /// Free-form metadata echoed back by Paystack.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Accept any JSON number (or null) and round it half up to whole kobo.
fn rounded_amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = Option::<f64>::deserialize(deserializer)?.unwrap_or_default();
    #[allow(clippy::cast_possible_truncation)] // saturating; JSON numbers are finite
    Ok((amount + 0.5).floor() as i64)
}

impl InitializeTransaction {
    /// Names of required fields that are missing.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.amount <= 0 {
            missing.push("amount");
        }
        if self.reference.trim().is_empty() {
            missing.push("reference");
        }
        missing
    }
}

/// Request body for `POST /transaction/initialize`.
#[derive(Debug, Serialize)]
pub(crate) struct InitializeBody<'a> {
    pub email: &'a str,
    pub amount: i64,
    pub reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a serde_json::Value>,
    pub callback_url: &'a str,
}

/// Every Paystack response is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the API call itself succeeded.
    pub status: bool,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Payload.
    pub data: T,
}

/// Where to send the payer to complete a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationHandle {
    /// Hosted checkout URL.
    pub authorization_url: String,
    /// Checkout access code.
    pub access_code: String,
    /// Transaction reference.
    pub reference: String,
}

/// Outcome of `GET /transaction/verify/:reference`.
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    /// Transaction status (`success`, `failed`, `abandoned`, ...).
    pub status: String,
    /// The transaction object exactly as Paystack returned it.
    pub raw: serde_json::Value,
}

impl VerifiedTransaction {
    /// Build from the `data` object of a verify response.
    #[must_use]
    pub fn from_data(raw: serde_json::Value) -> Self {
        let status = raw
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self { status, raw }
    }

    /// Whether the payment settled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }
}

/// Paystack error body.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackErrorResponse {
    /// Always false for errors.
    #[serde(default)]
    pub status: bool,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verified_transaction_reads_status() {
        let tx = VerifiedTransaction::from_data(serde_json::json!({
            "status": "success",
            "reference": "PALM-1-12345",
            "amount": 1_550_000
        }));
        assert!(tx.is_success());

        let abandoned =
            VerifiedTransaction::from_data(serde_json::json!({ "status": "abandoned" }));
        assert!(!abandoned.is_success());
        assert_eq!(abandoned.status, "abandoned");
    }

    #[test]
    fn initialize_missing_fields() {
        let input: InitializeTransaction =
            serde_json::from_value(serde_json::json!({ "email": "ada@example.com" })).unwrap();
        assert_eq!(input.missing_fields(), vec!["amount", "reference"]);
    }

    #[test]
    fn initialize_rounds_fractional_amounts() {
        let amount = |value: serde_json::Value| {
            serde_json::from_value::<InitializeTransaction>(serde_json::json!({ "amount": value }))
                .unwrap()
                .amount
        };
        assert_eq!(amount(serde_json::json!(1_550_000)), 1_550_000);
        assert_eq!(amount(serde_json::json!(1_550_000.5)), 1_550_001);
        assert_eq!(amount(serde_json::json!(1_550_000.4)), 1_550_000);
        assert_eq!(amount(serde_json::Value::Null), 0);
    }
}
