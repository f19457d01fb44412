//! Milkrun API Library
//!
//! Core functionality for the Milkrun dairy-delivery backend.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod slots;

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, routing::post, routing::put, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: services::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: middleware_helpers::request_id::current_request_id(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// The versioned API surface. Role gates are enforced by the extractors
/// (`AuthUser`, `AdminUser`, `DeliveryUser`) on each handler.
pub fn api_v1_routes() -> Router<AppState> {
    // Public storefront
    let storefront = Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .route("/delivery-slots", get(handlers::orders::delivery_slots));

    // Customer endpoints
    let customer = Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route(
            "/payments/sessions",
            post(handlers::payments::create_session),
        )
        .route(
            "/payments/sessions/:id",
            get(handlers::payments::get_session),
        )
        .route(
            "/payments/sessions/:id/complete",
            post(handlers::payments::complete_session),
        );

    // Delivery personnel endpoints
    let delivery = Router::new()
        .route("/delivery/queue", get(handlers::delivery::work_queue))
        .route(
            "/delivery/orders/:id/delivered",
            post(handlers::delivery::mark_delivered),
        );

    // Back office
    let admin = Router::new()
        .route("/orders", get(handlers::admin::list_orders))
        .route(
            "/orders/:id/status",
            put(handlers::admin::update_order_status),
        )
        .route(
            "/orders/:id/notes",
            put(handlers::admin::update_order_notes),
        )
        .route("/products", get(handlers::products::admin_list_products))
        .route("/products", post(handlers::products::admin_create_product))
        .route(
            "/products/:id",
            put(handlers::products::admin_update_product),
        )
        .route(
            "/products/:id/stock",
            put(handlers::products::admin_adjust_stock),
        )
        .route(
            "/delivery-boys",
            get(handlers::admin::list_delivery_boys),
        )
        .route(
            "/delivery-boys",
            post(handlers::admin::create_delivery_boy),
        )
        .route(
            "/delivery-boys/:id/active",
            put(handlers::admin::set_delivery_boy_active),
        )
        .route("/assignments", post(handlers::admin::create_assignment))
        .route("/assignments/reassign", post(handlers::admin::reassign))
        .route(
            "/assignments/:customer_id",
            axum::routing::delete(handlers::admin::remove_assignment),
        )
        .route(
            "/assignments/:customer_id/history",
            get(handlers::admin::assignment_history),
        )
        .route(
            "/assignments/bulk-transfer",
            post(handlers::admin::bulk_transfer),
        )
        .route(
            "/assignments/sequence/users",
            put(handlers::admin::sequence_users),
        )
        .route(
            "/assignments/sequence/orders",
            put(handlers::admin::sequence_orders),
        )
        .route("/payments/pending", get(handlers::admin::pending_payments))
        .route(
            "/payments/:id/verify",
            post(handlers::admin::verify_payment),
        )
        .route(
            "/payments/:id/reject",
            post(handlers::admin::reject_payment),
        )
        .route(
            "/reports/summary",
            get(handlers::admin::dashboard_summary),
        );

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(storefront)
        .merge(customer)
        .merge(delivery)
        .nest("/admin", admin)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "milkrun-api",
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::services::*;
    pub use crate::slots::*;
}
