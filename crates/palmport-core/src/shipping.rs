//! Shipping fee configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, Result};

/// Flat shipping fee used until an admin configures one.
pub const DEFAULT_SHIPPING_FEE: i64 = 1000;

/// Order subtotal above which shipping is free, until configured.
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: i64 = 5000;

/// Store-wide shipping settings (a singleton row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSettings {
    /// Flat shipping fee.
    pub shipping_fee: i64,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: i64,
    /// When an admin last saved the settings; `None` for defaults.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ShippingSettings {
    fn default() -> Self {
        Self {
            shipping_fee: DEFAULT_SHIPPING_FEE,
            free_shipping_threshold: DEFAULT_FREE_SHIPPING_THRESHOLD,
            updated_at: None,
        }
    }
}

impl ShippingSettings {
    /// Build validated settings.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Validation` unless both values are positive.
    pub fn new(shipping_fee: i64, free_shipping_threshold: i64) -> Result<Self> {
        if shipping_fee <= 0 || free_shipping_threshold <= 0 {
            return Err(CommerceError::Validation(
                "Shipping fee and free shipping threshold are required".into(),
            ));
        }
        Ok(Self {
            shipping_fee,
            free_shipping_threshold,
            updated_at: None,
        })
    }

    /// Shipping charged for a given subtotal.
    #[must_use]
    pub const fn fee_for(&self, subtotal: i64) -> i64 {
        if subtotal >= self.free_shipping_threshold {
            0
        } else {
            self.shipping_fee
        }
    }
}
