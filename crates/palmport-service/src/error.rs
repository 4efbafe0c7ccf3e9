//! API error types and responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use palmport_core::CommerceError;
use palmport_store::StoreError;

use crate::lifecycle::LifecycleError;
use crate::media::MediaError;
use crate::paystack::PaymentError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A status value outside its enumerated set.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// The gateway reported a payment that did not succeed.
    #[error("payment not confirmed: {status}")]
    PaymentNotConfirmed {
        /// Status reported by the gateway.
        status: String,
    },

    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Conflict - invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A payment, image or QR service failed.
    #[error("upstream error: {message}")]
    Upstream {
        /// What failed, shown to the caller.
        message: String,
        /// Upstream error detail.
        details: Option<String>,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// An upstream failure with its detail surfaced to the caller.
    pub fn upstream(message: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            message: message.into(),
            details: Some(err.to_string()),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            Self::InvalidStatus(msg) => (StatusCode::BAD_REQUEST, "invalid_status", msg, None),
            Self::PaymentNotConfirmed { status } => (
                StatusCode::BAD_REQUEST,
                "payment_not_confirmed",
                "Payment verification failed".to_string(),
                Some(serde_json::json!({ "status": status })),
            ),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            Self::Upstream { message, details } => {
                tracing::error!(error = %message, details = ?details, "Upstream service error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream_error",
                    message,
                    details.map(serde_json::Value::String),
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// "order" -> "Order".
fn capitalize(entity: &str) -> String {
    let mut chars = entity.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<CommerceError> for ApiError {
    fn from(err: CommerceError) -> Self {
        match err {
            CommerceError::Validation(msg) => Self::BadRequest(msg),
            CommerceError::InvalidStatus { kind, .. } => {
                Self::InvalidStatus(format!("Invalid {kind} status"))
            }
            CommerceError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            CommerceError::InvalidRole(_) | CommerceError::InvalidId(_) => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, .. } => {
                Self::NotFound(format!("{} not found", capitalize(entity)))
            }
            StoreError::Conflict { entity, key } => {
                Self::Conflict(format!("{} already exists: {key}", capitalize(entity)))
            }
            StoreError::Rejected(rejection) => rejection.into(),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Rejected(rejection) => rejection.into(),
            LifecycleError::OrderNotFound(_) => Self::NotFound("Order not found".into()),
            LifecycleError::PaymentNotConfirmed { status } => Self::PaymentNotConfirmed { status },
            LifecycleError::Payment(e) => Self::upstream("Payment verification failed", e),
            LifecycleError::Store(e) => e.into(),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self::upstream("Payment gateway error", err)
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::InvalidImage(_) => Self::BadRequest(err.to_string()),
            other => Self::upstream("Image upload failed", other),
        }
    }
}
