//! Customer registration and login.

use std::sync::Arc;

use axum::extract::State;
use serde::{Deserialize, Serialize};

use palmport_core::{Account, NewAccount, Role, UserId};
use palmport_store::StoreError;

use crate::auth::{AuthUser, Claims};
use crate::crypto::{hash_password, verify_password};
use crate::error::ApiError;
use crate::extract::Json;
use crate::state::AppState;

/// Public view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    /// Account id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Account role.
    pub role: Role,
}

impl From<&Account> for UserView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}

impl From<&Claims> for UserView {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name.clone(),
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

/// Register request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Login email.
    #[serde(default)]
    pub email: String,
    /// Plain-text password.
    #[serde(default)]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    #[serde(default)]
    pub email: String,
    /// Plain-text password.
    #[serde(default)]
    pub password: String,
}

/// Token issued on register or login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Bearer token.
    pub token: String,
    /// The signed-in account.
    pub user: UserView,
}

/// Create a customer account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let name = request.name.trim();
    let email = request.email.trim();
    if name.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest("All fields are required".into()));
    }

    if state.store.find_account_by_email(email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".into()));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))?;

    let account = state
        .store
        .create_account(NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::User,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict { .. } => ApiError::BadRequest("User already exists".into()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %account.id, "Account registered");

    Ok(Json(SessionResponse {
        token: state.tokens.issue(&account)?,
        user: UserView::from(&account),
    }))
}

/// Exchange credentials for a token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password required".into()));
    }

    let account = state
        .store
        .find_account_by_email(email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("User not found".into()))?;

    if !verify_password(&request.password, &account.password_hash) {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    Ok(Json(SessionResponse {
        token: state.tokens.issue(&account)?,
        user: UserView::from(&account),
    }))
}

/// Echo the identity in the presented token.
pub async fn verify(auth: AuthUser) -> Json<UserView> {
    Json(UserView::from(&auth.claims))
}
