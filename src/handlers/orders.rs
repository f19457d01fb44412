use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::handlers::PaginationParams;
use crate::services::orders::{CreateOrderRequest, OrderListResponse, OrderResponse};
use crate::slots::{self, DaySlots};
use crate::{errors::ServiceError, ApiResponse, ApiResult, AppState};

/// The seven orderable delivery days as of now.
#[utoipa::path(
    get,
    path = "/api/v1/delivery-slots",
    responses((status = 200, description = "Available delivery slots")),
    tag = "Orders"
)]
pub async fn delivery_slots() -> ApiResult<Vec<DaySlots>> {
    Ok(Json(ApiResponse::success(slots::available_slots(Utc::now()))))
}

/// Place a new order.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created"),
        (status = 422, description = "Slot or stock rejection", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let customer_id = user.customer_id()?;
    let order = state
        .services
        .orders
        .create_order(customer_id, request, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// The caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(PaginationParams),
    responses((status = 200, description = "Order listing")),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<OrderListResponse> {
    let customer_id = user.customer_id()?;
    let listing = state
        .services
        .orders
        .list_for_customer(customer_id, pagination.page, pagination.per_page)
        .await?;
    Ok(Json(ApiResponse::success(listing)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    responses(
        (status = 200, description = "Order detail"),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let customer_id = user.customer_id()?;
    let order = state
        .services
        .orders
        .get_order_for_customer(customer_id, id)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

/// Cancel one of the caller's orders, subject to the shift cutoff.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled"),
        (status = 422, description = "Cancellation window closed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelOrderRequest>,
) -> ApiResult<OrderResponse> {
    let customer_id = user.customer_id()?;
    let order = state
        .services
        .orders
        .cancel_order(customer_id, id, request.reason, Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
