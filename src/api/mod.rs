//! HTTP surface.
//!
//! Every handler answers with an [`ActionResult`](crate::ActionResult) body, including failures.

pub mod auth;
mod routes;

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::Services;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self { Self { services } }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .route("/api/v1/catalog/latest", get(routes::latest_products))
        .route("/api/v1/catalog/products", get(routes::list_products))
        .route("/api/v1/catalog/products/:slug", get(routes::product_by_slug))
        .route("/api/v1/admin/products", post(routes::create_product))
        .route("/api/v1/admin/products/:id", put(routes::update_product).delete(routes::delete_product))
        .route("/api/v1/cart", get(routes::get_cart))
        .route("/api/v1/cart/items", post(routes::add_to_cart))
        .route("/api/v1/cart/items/:product_id", delete(routes::remove_from_cart))
        .route("/api/v1/orders", get(routes::my_orders).post(routes::place_order))
        .route("/api/v1/orders/:id", get(routes::get_order))
        .route("/api/v1/orders/:id/paypal", post(routes::create_paypal_order))
        .route("/api/v1/orders/:id/paypal/approve", post(routes::approve_paypal_order))
        .route("/api/v1/admin/orders", get(routes::list_orders))
        .route("/api/v1/admin/orders/:id", delete(routes::delete_order))
        .route("/api/v1/admin/orders/:id/pay-cash", post(routes::confirm_cash_payment))
        .route("/api/v1/admin/orders/:id/deliver", post(routes::mark_delivered))
        .route("/api/v1/profile", get(routes::get_profile).put(routes::update_profile))
        .route("/api/v1/profile/address", put(routes::update_address))
        .route("/api/v1/profile/payment-method", put(routes::update_payment_method))
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
