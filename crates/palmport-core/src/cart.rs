//! Shopping cart line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, Result};
use crate::{ProductId, UserId};

/// Largest quantity a single cart line can hold.
pub const MAX_CART_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// Quantity after adding `added` to a line holding `current`.
///
/// # Errors
///
/// Returns `CommerceError::Validation` past [`MAX_CART_QUANTITY`].
pub fn accumulate_quantity(current: u32, added: u32) -> Result<u32> {
    current
        .checked_add(added)
        .filter(|total| *total <= MAX_CART_QUANTITY)
        .ok_or_else(|| CommerceError::Validation("Quantity is too large".into()))
}

/// One product in a user's cart. Keyed by `(user_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Owning account.
    pub user_id: UserId,
    /// Product in the cart.
    pub product_id: ProductId,
    /// Accumulated quantity.
    pub quantity: u32,
    /// When the product was first added.
    pub created_at: DateTime<Utc>,
}

/// Outcome of adding to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAddOutcome {
    /// The product was not in the cart yet.
    Inserted,
    /// The quantity of an existing line was increased.
    Accumulated,
}
