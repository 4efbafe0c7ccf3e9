//! Order handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use palmport_core::{
    Channel, CustomerDetails, Order, OrderAmounts, OrderDraft, OrderId, OrderItem, OrderWithUser,
};

use super::parse_id;
use crate::auth::{AdminAuth, AuthUser};
use crate::error::ApiError;
use crate::extract::Json;
use crate::state::AppState;

/// Checkout request shared by both channels.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Contact and delivery details.
    #[serde(flatten)]
    pub customer: CustomerDetails,
    /// Line items.
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Sum of line totals.
    #[serde(default)]
    pub subtotal: i64,
    /// Shipping fee.
    #[serde(default)]
    pub shipping: i64,
    /// Amount due.
    #[serde(default)]
    pub total: i64,
    /// Customer notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Gateway reference chosen by the client (online orders).
    #[serde(default)]
    pub payment_reference: Option<String>,
}

impl CreateOrderRequest {
    fn into_draft(self, channel: Channel, auth: &AuthUser) -> OrderDraft {
        OrderDraft {
            channel,
            user_id: auth.user_id,
            customer: self.customer,
            items: self.items,
            amounts: OrderAmounts {
                subtotal: self.subtotal,
                shipping: self.shipping,
                total: self.total,
            },
            notes: self.notes.unwrap_or_default(),
            payment_reference: match channel {
                Channel::Online => self.payment_reference,
                Channel::Assisted => None,
            },
        }
    }
}

/// Place an online (card) order.
pub async fn create_online(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .orders
        .create(request.into_draft(Channel::Online, &auth))
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Place an assisted (WhatsApp) order.
pub async fn create_assisted(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .orders
        .create(request.into_draft(Channel::Assisted, &auth))
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's orders, newest first.
pub async fn my_orders(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_for_user(&auth.user_id).await?))
}

/// Every order with its account, newest first.
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<Vec<OrderWithUser>>, ApiError> {
    Ok(Json(state.orders.list_all().await?))
}

/// Status update request. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// New delivery status.
    #[serde(default)]
    pub delivery_status: Option<String>,
    /// New payment status.
    #[serde(default)]
    pub payment_status: Option<String>,
}

/// Change an order's delivery and/or payment status.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "Order")?;

    tracing::debug!(
        admin = %admin.user_id,
        order_id = %order_id,
        delivery_status = ?request.delivery_status,
        payment_status = ?request.payment_status,
        "Status update requested"
    );

    let order = state
        .orders
        .update_status(
            &order_id,
            request.delivery_status.as_deref(),
            request.payment_status.as_deref(),
        )
        .await?;
    Ok(Json(order))
}
