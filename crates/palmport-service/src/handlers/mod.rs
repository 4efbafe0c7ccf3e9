//! API handlers.

pub mod admin;
pub mod auth;
pub mod batches;
pub mod cart;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod shipping;
pub mod subscribe;

use std::str::FromStr;

use serde::Serialize;

use crate::error::ApiError;

/// `{ "message": ... }` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

impl MessageResponse {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{ "success": true, "message": ... }` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    /// Always true; failures use the error body.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl SuccessResponse {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Parse a path id; an unparseable id cannot name an existing record.
pub(crate) fn parse_id<T: FromStr>(raw: &str, entity: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("{entity} not found")))
}
