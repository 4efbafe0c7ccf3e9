//! Shopping cart handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Deserialize;

use palmport_core::{CartAddOutcome, CartItem, ProductId};

use super::{parse_id, MessageResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::Json;
use crate::state::AppState;

/// The caller's cart.
pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<CartItem>>, ApiError> {
    Ok(Json(state.store.list_cart(&auth.user_id).await?))
}

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    /// Product to add.
    #[serde(alias = "productId")]
    pub product_id: ProductId,
    /// Units to add (default: 1).
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Add a product, accumulating onto an existing line.
pub async fn add(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.quantity == 0 {
        return Err(ApiError::BadRequest("Quantity must be at least 1".into()));
    }

    let outcome = state
        .store
        .add_to_cart(&auth.user_id, &request.product_id, request.quantity)
        .await?;

    Ok(Json(MessageResponse::new(match outcome {
        CartAddOutcome::Inserted => "Item added to cart",
        CartAddOutcome::Accumulated => "Cart updated successfully",
    })))
}

/// Remove a product from the cart. Removing an absent product succeeds.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "Product")?;
    let removed = state
        .store
        .remove_from_cart(&auth.user_id, &product_id)
        .await?;
    tracing::debug!(
        user_id = %auth.user_id,
        product_id = %product_id,
        removed,
        "Cart item removed"
    );

    Ok(Json(MessageResponse::new("Item removed from cart")))
}
