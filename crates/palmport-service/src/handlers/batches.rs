//! Batch traceability handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use palmport_core::{trace_url, Batch, BatchFields, BatchRecordId, BatchView, NewBatch};

use super::{parse_id, MessageResponse};
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::extract::Json;
use crate::state::AppState;

/// Batch create request.
#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    /// Public traceability code.
    #[serde(default)]
    pub batch_id: String,
    /// Editable fields.
    #[serde(flatten)]
    pub fields: BatchFields,
    /// Optional image, base64 or data URL.
    #[serde(default, rename = "imageBase64")]
    pub image_base64: Option<String>,
}

/// Batch update request. The public code cannot change.
#[derive(Debug, Deserialize)]
pub struct UpdateBatchRequest {
    /// Editable fields.
    #[serde(flatten)]
    pub fields: BatchFields,
    /// Optional new image, base64 or data URL.
    #[serde(default, rename = "imageBase64")]
    pub image_base64: Option<String>,
}

/// Every batch with its product, newest first.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<BatchView>>, ApiError> {
    Ok(Json(state.store.list_batches().await?))
}

/// Public trace lookup by batch code.
pub async fn trace(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchView>, ApiError> {
    state
        .store
        .find_batch(&batch_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Batch not found".into()))
}

/// Record a batch and generate its QR code.
pub async fn create(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Json(request): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<Batch>), ApiError> {
    let batch_id = request.batch_id.trim().to_string();
    if batch_id.is_empty() {
        return Err(ApiError::BadRequest("batch_id is required".into()));
    }

    let image_url = state.upload_image(request.image_base64.as_deref()).await?;
    let qr_code_url = state
        .qr_data_url(&trace_url(&state.config.client_url, &batch_id))
        .await?;

    let batch = state
        .store
        .insert_batch(NewBatch {
            batch_id,
            fields: request.fields,
            qr_code_url,
            image_url,
        })
        .await?;

    tracing::info!(batch_id = %batch.batch_id, "Batch created");
    Ok((StatusCode::CREATED, Json(batch)))
}

/// Replace a batch's fields. The image is kept unless a new one is sent.
pub async fn update(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
    Json(request): Json<UpdateBatchRequest>,
) -> Result<Json<Batch>, ApiError> {
    let id: BatchRecordId = parse_id(&id, "Batch")?;
    let image_url = state.upload_image(request.image_base64.as_deref()).await?;
    Ok(Json(
        state
            .store
            .update_batch(&id, request.fields, image_url)
            .await?,
    ))
}

/// Remove a batch.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: BatchRecordId = parse_id(&id, "Batch")?;
    state.store.delete_batch(&id).await?;
    Ok(Json(MessageResponse::new("Batch deleted successfully")))
}
