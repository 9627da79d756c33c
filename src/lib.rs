//! Storefront API Library
//!
//! Order lifecycle and payment reconciliation for the storefront: order
//! creation from cart lines, coupon discounts, online and cash-on-delivery
//! checkout, gateway signature verification, admin status transitions with
//! an audit trail, and shipment creation/tracking through the courier
//! provider.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod notifications;
pub mod services;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{roles, AuthRouterExt};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<axum::Json<ApiResponse<T>>, errors::ServiceError>;

/// Builds the versioned API surface.
///
/// Routes are grouped by required capability: bearer-token user routes,
/// admin routes gated by role, and unauthenticated public reads.
pub fn api_v1_routes() -> Router<AppState> {
    let orders_user = Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/invoices", get(handlers::orders::list_invoices))
        .route("/orders/history", get(handlers::orders::all_order_history))
        .route(
            "/orders/verify-payment",
            post(handlers::payments::verify_payment),
        )
        .route(
            "/orders/:id",
            get(handlers::orders::get_order).delete(handlers::orders::delete_order),
        )
        .route("/orders/:id/history", get(handlers::orders::order_history))
        .route(
            "/orders/:id/checkout",
            post(handlers::payments::create_checkout),
        )
        .route(
            "/orders/:id/cod-checkout",
            post(handlers::payments::cod_checkout),
        )
        .route(
            "/orders/:id/apply-coupon",
            post(handlers::coupons::apply_coupon),
        )
        .route("/orders/:id/track", get(handlers::shipments::track_order))
        .route(
            "/orders/items/:id",
            patch(handlers::orders::update_order_item),
        )
        .with_auth();

    let orders_admin = Router::new()
        .route(
            "/orders/:id/status",
            patch(handlers::orders::update_order_status),
        )
        .route(
            "/orders/:id/shipment",
            post(handlers::shipments::create_shipment),
        )
        .route(
            "/orders/:id/assign-tracking",
            post(handlers::shipments::assign_tracking),
        )
        .with_role(roles::ADMIN);

    let reviews_user = Router::new()
        .route("/reviews", post(handlers::reviews::create_review))
        .route(
            "/reviews/:id",
            patch(handlers::reviews::update_review).delete(handlers::reviews::delete_review),
        )
        .with_auth();

    let coupons_admin = Router::new()
        .route("/coupons", post(handlers::coupons::create_coupon))
        .route("/coupons/:id", delete(handlers::coupons::delete_coupon))
        .with_role(roles::ADMIN);

    let public = Router::new()
        .route("/coupons", get(handlers::coupons::list_coupons))
        .route("/coupons/:id", get(handlers::coupons::get_coupon))
        .route(
            "/reviews/product/:product_id",
            get(handlers::reviews::product_reviews),
        );

    Router::new()
        .merge(orders_user)
        .merge(orders_admin)
        .merge(reviews_user)
        .merge(coupons_admin)
        .merge(public)
}
