//! Paystack API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::types::{
    AuthorizationHandle, Envelope, InitializeBody, InitializeTransaction, PaystackErrorResponse,
    VerifiedTransaction,
};
use super::PaymentGateway;

/// Error type for payment gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Paystack returned an error.
    #[error("Paystack API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// No gateway is configured for this deployment.
    #[error("payment gateway is not configured")]
    NotConfigured,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Paystack API client.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    client: Client,
    base_url: String,
    secret_key: String,
    callback_url: String,
}

impl PaystackClient {
    /// Create a new Paystack client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL (`https://api.paystack.co` in production)
    /// * `secret_key` - Paystack secret key (`sk_test_...` or `sk_live_...`)
    /// * `callback_url` - Where Paystack redirects the payer afterwards
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Configuration` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            callback_url: callback_url.into(),
        })
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<PaystackErrorResponse>().await {
            Ok(body) if !body.message.is_empty() => body.message,
            _ => format!("HTTP {status}"),
        };

        Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize_transaction(
        &self,
        request: &InitializeTransaction,
    ) -> Result<Envelope<AuthorizationHandle>, PaymentError> {
        let body = InitializeBody {
            email: &request.email,
            amount: request.amount,
            reference: &request.reference,
            metadata: request.metadata.as_ref(),
            callback_url: &self.callback_url,
        };

        tracing::debug!(
            reference = %request.reference,
            amount = request.amount,
            "Initializing Paystack transaction"
        );

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<VerifiedTransaction, PaymentError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| PaymentError::Configuration("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["transaction", "verify", reference]);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let envelope: Envelope<serde_json::Value> = Self::handle_response(response).await?;
        let transaction = VerifiedTransaction::from_data(envelope.data);

        tracing::debug!(
            reference = %reference,
            status = %transaction.status,
            "Paystack transaction verified"
        );

        Ok(transaction)
    }
}
