use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::DeliveryUser;
use crate::services::orders::{MarkDeliveredRequest, OrderResponse, WorkQueueGroup};
use crate::slots;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct QueueParams {
    /// Defaults to today in delivery-local time
    pub date: Option<NaiveDate>,
}

/// The caller's route for the day: orders grouped by customer in admin
/// sequence order.
#[utoipa::path(
    get,
    path = "/api/v1/delivery/queue",
    params(QueueParams),
    responses((status = 200, description = "Work queue")),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn work_queue(
    State(state): State<AppState>,
    user: DeliveryUser,
    Query(params): Query<QueueParams>,
) -> ApiResult<Vec<WorkQueueGroup>> {
    let delivery_boy_id = user.0.delivery_boy_id()?;
    let date = params
        .date
        .unwrap_or_else(|| slots::to_ist(Utc::now()).date_naive());
    let queue = state
        .services
        .orders
        .work_queue(delivery_boy_id, date)
        .await?;
    Ok(Json(ApiResponse::success(queue)))
}

/// Mark an assigned, confirmed order delivered. Only valid inside the
/// shift's delivery window.
#[utoipa::path(
    post,
    path = "/api/v1/delivery/orders/{id}/delivered",
    request_body = MarkDeliveredRequest,
    responses(
        (status = 200, description = "Order delivered"),
        (status = 422, description = "Outside the delivery window", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn mark_delivered(
    State(state): State<AppState>,
    user: DeliveryUser,
    Path(id): Path<Uuid>,
    Json(request): Json<MarkDeliveredRequest>,
) -> ApiResult<OrderResponse> {
    let delivery_boy_id = user.0.delivery_boy_id()?;
    let order = state
        .services
        .orders
        .mark_delivered(delivery_boy_id, id, request, Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
