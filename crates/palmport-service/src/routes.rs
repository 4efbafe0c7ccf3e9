//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    admin, auth, batches, cart, health, orders, payments, products, shipping, subscribe,
};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for storefront endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for admin endpoints.
/// Uploads and mass mail are heavy, so the admin surface gets less room.
const ADMIN_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /api/auth/register`, `POST /api/auth/login`
/// - `POST /api/payments/initialize` - Gateway proxy
/// - `POST /api/subscribe` - Join the mailing list
/// - `GET /api/products`, `GET /api/batches`, `GET /api/batches/:batch_id`
/// - `GET /api/shipping/settings`
///
/// ## Customer (bearer token)
/// - `GET /api/auth/verify`
/// - `POST /api/orders`, `POST /api/orders/whatsapp-order`, `GET /api/orders/my-orders`
/// - `GET /api/payments/verify/:reference`
/// - `GET /api/cart`, `POST /api/cart/add`, `DELETE /api/cart/remove/:product_id`
///
/// ## Admin (bearer token, admin role)
/// - `POST /api/admin/login`, `GET /api/admin/verify`, `GET /api/admin/dashboard`
/// - `GET /api/admin/orders`, `PUT /api/admin/orders/:id/status`
/// - `GET /api/orders`, `PUT /api/orders/:id/status`
/// - `GET|POST /api/subscribe/...`, `DELETE /api/subscribe/:id`
/// - `POST /api/products`, `PUT|DELETE /api/products/:id`
/// - `POST /api/batches`, `PUT|DELETE /api/batches/:id`
/// - `PUT /api/shipping/settings`, `GET /api/shipping/admin/settings`
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let admin_routes = Router::new()
        .route("/login", post(admin::login))
        .route("/verify", get(admin::verify))
        .route("/dashboard", get(admin::dashboard))
        .route("/orders", get(admin::list_orders))
        .route("/orders/:id/status", put(orders::update_status))
        .layer(ConcurrencyLimitLayer::new(ADMIN_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", get(auth::verify))
        // Orders
        .route("/orders", post(orders::create_online).get(orders::list_all))
        .route("/orders/whatsapp-order", post(orders::create_assisted))
        .route("/orders/my-orders", get(orders::my_orders))
        .route("/orders/:id/status", put(orders::update_status))
        // Payments
        .route("/payments/initialize", post(payments::initialize))
        .route("/payments/verify/:reference", get(payments::verify))
        // Cart
        .route("/cart", get(cart::list))
        .route("/cart/add", post(cart::add))
        .route("/cart/remove/:product_id", delete(cart::remove))
        // Mailing list
        .route("/subscribe", post(subscribe::subscribe).get(subscribe::list))
        .route("/subscribe/send", post(subscribe::send))
        .route("/subscribe/:id", delete(subscribe::delete))
        // Catalog
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/:id",
            put(products::update).delete(products::delete),
        )
        .route("/batches", get(batches::list).post(batches::create))
        .route(
            "/batches/:id",
            get(batches::trace)
                .put(batches::update)
                .delete(batches::delete),
        )
        // Shipping
        .route(
            "/shipping/settings",
            get(shipping::get).put(shipping::update),
        )
        .route("/shipping/admin/settings", get(shipping::admin_get))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        .nest("/admin", admin_routes);

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/api", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
