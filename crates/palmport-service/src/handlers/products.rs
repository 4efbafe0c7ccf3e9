//! Product catalog handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use palmport_core::{Product, ProductFields, ProductId};

use super::{parse_id, MessageResponse};
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::extract::Json;
use crate::state::AppState;

/// Product create/update request.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    /// Editable fields.
    #[serde(flatten)]
    pub fields: ProductFields,
    /// Optional new image, base64 or data URL.
    #[serde(default, rename = "imageBase64")]
    pub image_base64: Option<String>,
}

/// Every product, newest first.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.store.list_products().await?))
}

/// Add a product.
pub async fn create(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Json(request): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    request.fields.validate()?;
    let image_url = state.upload_image(request.image_base64.as_deref()).await?;
    let product = state.store.insert_product(request.fields, image_url).await?;

    tracing::info!(product_id = %product.id, name = %product.fields.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields. The image is kept unless a new one is sent.
pub async fn update(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id, "Product")?;
    request.fields.validate()?;

    if state.store.get_product(&id).await?.is_none() {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    let image_url = state.upload_image(request.image_base64.as_deref()).await?;
    Ok(Json(
        state
            .store
            .update_product(&id, request.fields, image_url)
            .await?,
    ))
}

/// Remove a product.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: ProductId = parse_id(&id, "Product")?;
    state.store.delete_product(&id).await?;
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}
