//! Catalog and traceability records.
//!
//! Products are what the shop sells; batches are production runs whose public
//! `batch_id` is encoded in a QR code so buyers can trace provenance.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, Result};
use crate::{BatchRecordId, ProductId};

/// Editable product fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFields {
    /// Product name.
    pub name: String,
    /// Marketing description.
    #[serde(default)]
    pub description: String,
    /// Current price.
    pub price: i64,
    /// Price before discount, if discounted.
    #[serde(default)]
    pub original_price: Option<i64>,
    /// Pack size.
    #[serde(default)]
    pub size: String,
    /// Bullet-point features.
    #[serde(default)]
    pub features: Vec<String>,
    /// Availability flag.
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

impl ProductFields {
    /// # Errors
    ///
    /// Returns `CommerceError::Validation` for a blank name or negative price.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CommerceError::Validation("Product name is required".into()));
        }
        if self.price < 0 {
            return Err(CommerceError::Validation("Price cannot be negative".into()));
        }
        Ok(())
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,
    /// Editable fields.
    #[serde(flatten)]
    pub fields: ProductFields,
    /// Hosted image, if one was uploaded.
    pub image_url: Option<String>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

/// Editable batch fields. The public `batch_id` is fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFields {
    /// Batch headline.
    #[serde(default)]
    pub title: String,
    /// Producing state or region.
    #[serde(default)]
    pub state: String,
    /// Producer.
    #[serde(default)]
    pub manufacturer: String,
    /// Quality grade.
    #[serde(default)]
    pub quality: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Production date.
    #[serde(default)]
    pub manufacture_date: Option<NaiveDate>,
    /// Product this batch belongs to.
    #[serde(default)]
    pub product_id: Option<ProductId>,
}

/// A production batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Record identifier.
    pub id: BatchRecordId,
    /// Public traceability code (unique).
    pub batch_id: String,
    /// Editable fields.
    #[serde(flatten)]
    pub fields: BatchFields,
    /// PNG data URL encoding the trace page URL.
    pub qr_code_url: String,
    /// Hosted image, if one was uploaded.
    pub image_url: Option<String>,
    /// When the batch was recorded.
    pub created_at: DateTime<Utc>,
}

/// A batch ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewBatch {
    /// Public traceability code.
    pub batch_id: String,
    /// Editable fields.
    pub fields: BatchFields,
    /// PNG data URL encoding the trace page URL.
    pub qr_code_url: String,
    /// Hosted image.
    pub image_url: Option<String>,
}

impl NewBatch {
    /// Materialise the record with a fresh id.
    #[must_use]
    pub fn into_batch(self, id: BatchRecordId, created_at: DateTime<Utc>) -> Batch {
        Batch {
            id,
            batch_id: self.batch_id,
            fields: self.fields,
            qr_code_url: self.qr_code_url,
            image_url: self.image_url,
            created_at,
        }
    }
}

/// A batch joined with the product it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchView {
    /// The batch record.
    #[serde(flatten)]
    pub batch: Batch,
    /// Linked product name.
    pub product_name: Option<String>,
    /// Linked product size.
    pub product_size: Option<String>,
    /// Linked product description.
    pub product_description: Option<String>,
}

impl BatchView {
    /// Join a batch with its (optional) product.
    #[must_use]
    pub fn new(batch: Batch, product: Option<&Product>) -> Self {
        Self {
            product_name: product.map(|p| p.fields.name.clone()),
            product_size: product.map(|p| p.fields.size.clone()),
            product_description: product.map(|p| p.fields.description.clone()),
            batch,
        }
    }
}

/// Public trace page for a batch code.
#[must_use]
pub fn trace_url(client_url: &str, batch_id: &str) -> String {
    format!("{}/trace/{batch_id}", client_url.trim_end_matches('/'))
}
