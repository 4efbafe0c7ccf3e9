//! Paystack integration for card payments.
//!
//! The storefront starts a transaction through `initialize`, the payer
//! completes it on Paystack's hosted checkout, and `verify` confirms the
//! outcome before the order is marked paid.

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::{PaymentError, PaystackClient};
pub use types::*;

/// A payment provider the order lifecycle can settle against.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a transaction and return the hosted checkout handle.
    async fn initialize_transaction(
        &self,
        request: &InitializeTransaction,
    ) -> Result<Envelope<AuthorizationHandle>, PaymentError>;

    /// Look up the outcome of a transaction by reference.
    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<VerifiedTransaction, PaymentError>;
}
