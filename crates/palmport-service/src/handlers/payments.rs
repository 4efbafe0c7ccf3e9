//! Payment handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Serialize;

use palmport_core::Order;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::Json;
use crate::paystack::{AuthorizationHandle, Envelope, InitializeTransaction};
use crate::state::AppState;

/// Start a Paystack transaction and return its checkout handle.
pub async fn initialize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitializeTransaction>,
) -> Result<Json<Envelope<AuthorizationHandle>>, ApiError> {
    if !request.missing_fields().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required fields: email, amount, and reference are required".into(),
        ));
    }

    let gateway = state.payment_gateway()?;
    let handle = gateway
        .initialize_transaction(&request)
        .await
        .map_err(|e| ApiError::upstream("Payment initialization failed", e))?;

    tracing::info!(reference = %request.reference, "Payment initialized");
    Ok(Json(handle))
}

/// Successful verification body.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Always true.
    pub success: bool,
    /// Outcome message.
    pub message: String,
    /// The paid order.
    pub order: Order,
    /// Transaction as reported by Paystack.
    pub payment: serde_json::Value,
}

/// Verify a transaction and mark its order paid.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(reference): Path<String>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let verified = state
        .orders
        .verify_payment(&reference, &auth.user_id)
        .await?;

    Ok(Json(VerifyResponse {
        success: true,
        message: "Payment verified successfully".into(),
        order: verified.order,
        payment: verified.transaction,
    }))
}
