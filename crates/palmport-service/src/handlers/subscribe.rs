//! Mailing list handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Deserialize;

use palmport_core::{Subscriber, SubscriberId};

use super::{parse_id, SuccessResponse};
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::extract::Json;
use crate::state::AppState;
use crate::subscribers::SubscribeOutcome;

/// Subscribe request.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    /// Address to enroll.
    #[serde(default)]
    pub email: String,
}

/// Join the mailing list.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let message = match state.subscribers.subscribe(&request.email).await? {
        SubscribeOutcome::Subscribed(_) => "Subscribed successfully. Confirmation email sent.",
        SubscribeOutcome::AlreadySubscribed => "Already subscribed.",
    };
    Ok(Json(SuccessResponse::new(message)))
}

/// Every subscriber, newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<Vec<Subscriber>>, ApiError> {
    Ok(Json(state.subscribers.list().await?))
}

/// Broadcast request.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// HTML body.
    #[serde(default)]
    pub message: String,
}

/// Email every subscriber.
pub async fn send(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(request): Json<SendRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let report = state
        .subscribers
        .broadcast(&request.subject, &request.message)
        .await?;

    tracing::info!(
        admin = %admin.user_id,
        recipients = report.recipients,
        sent = report.sent,
        "Mass email dispatched"
    );
    Ok(Json(SuccessResponse::new(format!(
        "Mass email sent to {} subscribers.",
        report.recipients
    ))))
}

/// Remove a subscriber.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let id: SubscriberId = parse_id(&id, "Subscriber")?;
    state.subscribers.delete(&id).await?;
    Ok(Json(SuccessResponse::new("Subscriber deleted successfully")))
}
