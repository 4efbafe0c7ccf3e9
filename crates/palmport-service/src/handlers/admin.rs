//! Admin login and dashboard.

use std::sync::Arc;

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use palmport_core::OrderWithUser;
use palmport_store::DashboardCounts;

use super::auth::{LoginRequest, UserView};
use crate::auth::AdminAuth;
use crate::crypto::verify_password;
use crate::error::ApiError;
use crate::extract::Json;
use crate::state::AppState;

/// Orders shown on the dashboard.
const RECENT_ORDERS: u32 = 5;

/// Admin login response.
#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    /// Always true.
    pub success: bool,
    /// Bearer token.
    pub token: String,
    /// The admin account.
    pub user: UserView,
    /// Outcome message.
    pub message: String,
}

/// Log in with an admin account.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }

    let rejected = || ApiError::Unauthorized("Invalid email or password".into());

    let account = state
        .store
        .find_account_by_email(email)
        .await?
        .ok_or_else(rejected)?;

    if !account.role.is_admin() || !verify_password(&request.password, &account.password_hash) {
        tracing::warn!(email = %email, "Failed admin login");
        return Err(rejected());
    }

    tracing::info!(user_id = %account.id, "Admin logged in");

    Ok(Json(AdminLoginResponse {
        success: true,
        token: state.tokens.issue(&account)?,
        user: UserView::from(&account),
        message: "Login successful".into(),
    }))
}

/// Admin token check response.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Always true.
    pub valid: bool,
    /// The admin identity.
    pub user: UserView,
}

/// Confirm an admin token.
pub async fn verify(admin: AdminAuth) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: UserView::from(&admin.claims),
    })
}

/// Dashboard summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// All orders.
    pub total_orders: u64,
    /// Orders with delivery status `pending`.
    pub pending_orders: u64,
    /// All batches.
    pub total_batches: u64,
    /// All subscribers.
    pub total_subscribers: u64,
    /// Newest orders.
    pub recent_orders: Vec<OrderWithUser>,
}

/// Dashboard counts and recent orders.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<DashboardResponse>, ApiError> {
    let DashboardCounts {
        total_orders,
        pending_orders,
        total_batches,
        total_subscribers,
    } = state.store.dashboard_counts().await?;
    let recent = state.orders.list_page(1, RECENT_ORDERS).await?;

    Ok(Json(DashboardResponse {
        total_orders,
        pending_orders,
        total_batches,
        total_subscribers,
        recent_orders: recent.orders,
    }))
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// 1-based page (default: 1).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size (default: 10, max: 100).
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// One page of orders.
#[derive(Debug, Serialize)]
pub struct OrderPageResponse {
    /// Orders on this page, newest first.
    pub orders: Vec<OrderWithUser>,
    /// Orders across all pages.
    pub total: u64,
    /// This page.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

/// Paginated order list.
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Query(query): Query<PageQuery>,
) -> Result<Json<OrderPageResponse>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let result = state.orders.list_page(page, limit).await?;

    Ok(Json(OrderPageResponse {
        orders: result.orders,
        total: result.total,
        page,
        limit,
    }))
}
