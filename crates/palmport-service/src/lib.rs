//! PalmPort HTTP API Service.
//!
//! This crate provides the HTTP API for the PalmPort storefront, including:
//!
//! - Customer accounts and session tokens
//! - Online and WhatsApp-assisted orders with Paystack payment verification
//! - Carts, the product catalog and batch traceability
//! - The mailing list and transactional email
//!
//! # Authentication
//!
//! Every protected route takes an HS256 bearer token issued by
//! `/api/auth/login` or `/api/admin/login`. Admin routes additionally
//! require the `admin` role.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers that only read claims stay async for the router

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod lifecycle;
pub mod mail;
pub mod media;
pub mod paystack;
pub mod routes;
pub mod state;
pub mod subscribers;

pub use auth::{provision_admin, TokenKeys};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use lifecycle::OrderLifecycle;
pub use mail::{Mailer, Notifier};
pub use paystack::{PaymentGateway, PaystackClient};
pub use routes::create_router;
pub use state::{AppState, Integrations};
