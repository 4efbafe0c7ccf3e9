//! Shipping settings handlers.

use std::sync::Arc;

use axum::extract::State;
use serde::{Deserialize, Serialize};

use palmport_core::ShippingSettings;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::extract::Json;
use crate::state::AppState;

/// Current settings, or the defaults if never saved.
pub async fn get(State(state): State<Arc<AppState>>) -> Result<Json<ShippingSettings>, ApiError> {
    Ok(Json(
        state
            .store
            .get_shipping_settings()
            .await?
            .unwrap_or_default(),
    ))
}

/// Admin view of the settings.
pub async fn admin_get(
    state: State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<ShippingSettings>, ApiError> {
    get(state).await
}

/// Settings update request.
#[derive(Debug, Deserialize)]
pub struct UpdateShippingRequest {
    /// Flat shipping fee.
    #[serde(default)]
    pub shipping_fee: i64,
    /// Subtotal at which shipping becomes free.
    #[serde(default)]
    pub free_shipping_threshold: i64,
}

/// Settings update response.
#[derive(Debug, Serialize)]
pub struct UpdateShippingResponse {
    /// Always true.
    pub success: bool,
    /// Outcome message.
    pub message: String,
    /// Saved settings.
    pub settings: ShippingSettings,
}

/// Save new settings.
pub async fn update(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(request): Json<UpdateShippingRequest>,
) -> Result<Json<UpdateShippingResponse>, ApiError> {
    let settings = ShippingSettings::new(request.shipping_fee, request.free_shipping_threshold)?;
    let settings = state.store.put_shipping_settings(settings).await?;

    tracing::info!(
        admin = %admin.user_id,
        shipping_fee = settings.shipping_fee,
        free_shipping_threshold = settings.free_shipping_threshold,
        "Shipping settings updated"
    );

    Ok(Json(UpdateShippingResponse {
        success: true,
        message: "Shipping settings updated successfully".into(),
        settings,
    }))
}
