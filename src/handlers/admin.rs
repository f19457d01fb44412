use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::entities::{delivery_boy, order::OrderStatus, user_delivery_assignment};
use crate::services::assignments::{
    AssignRequest, BulkTransferRequest, ReassignRequest, SequenceOrdersRequest,
    SequenceUsersRequest,
};
use crate::services::orders::{AdminOrderFilter, OrderListResponse, OrderResponse};
use crate::services::payments::PaymentSessionResponse;
use crate::services::reports::DashboardSummary;
use crate::{errors::ServiceError, ApiResponse, ApiResult, AppState};

// ---- Orders ----

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminOrderParams {
    pub status: Option<OrderStatus>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_boy_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    #[serde(default = "crate::handlers::default_admin_page")]
    pub page: u64,
    #[serde(default = "crate::handlers::default_admin_per_page")]
    pub per_page: u64,
}

pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<AdminOrderParams>,
) -> ApiResult<OrderListResponse> {
    let filter = AdminOrderFilter {
        status: params.status,
        delivery_date: params.delivery_date,
        delivery_boy_id: params.delivery_boy_id,
        customer_id: params.customer_id,
    };
    let listing = state
        .services
        .orders
        .list_admin(filter, params.page, params.per_page)
        .await?;
    Ok(Json(ApiResponse::success(listing)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub admin_notes: Option<String>,
}

/// Admin transition of the order state machine; confirming commits stock,
/// cancelling a confirmed order restores it.
pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .update_status(id, request.status, request.admin_notes, Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderNotesRequest {
    pub admin_notes: Option<String>,
}

/// Notes stay editable even after an order reaches a terminal state.
pub async fn update_order_notes(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderNotesRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .update_admin_notes(id, request.admin_notes, Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

// ---- Delivery personnel ----

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDeliveryBoyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 7, max = 15))]
    pub phone: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub areas: Option<String>,
}

pub async fn create_delivery_boy(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateDeliveryBoyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<delivery_boy::Model>>), ServiceError> {
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let existing = delivery_boy::Entity::find()
        .filter(delivery_boy::Column::Email.eq(request.email.clone()))
        .one(&*state.db)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::Conflict(
            "A delivery person with this email already exists".to_string(),
        ));
    }

    let password_hash = state.services.auth.hash_password(&request.password)?;
    let model = delivery_boy::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(request.name),
        email: Set(request.email),
        phone: Set(request.phone),
        password_hash: Set(password_hash),
        areas: Set(request.areas),
        is_active: Set(true),
        total_deliveries: Set(0),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    };
    let created = model.insert(&*state.db).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn list_delivery_boys(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<delivery_boy::Model>> {
    let boys = delivery_boy::Entity::find()
        .order_by_asc(delivery_boy::Column::Name)
        .all(&*state.db)
        .await?;
    Ok(Json(ApiResponse::success(boys)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetDeliveryBoyActiveRequest {
    pub is_active: bool,
}

pub async fn set_delivery_boy_active(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetDeliveryBoyActiveRequest>,
) -> ApiResult<delivery_boy::Model> {
    let existing = delivery_boy::Entity::find_by_id(id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Delivery person {} not found", id)))?;

    let mut active: delivery_boy::ActiveModel = existing.into();
    active.is_active = Set(request.is_active);
    active.updated_at = Set(Some(Utc::now()));
    let updated = active.update(&*state.db).await?;
    Ok(Json(ApiResponse::success(updated)))
}

// ---- Assignments ----

pub async fn create_assignment(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<AssignRequest>,
) -> Result<
    (
        StatusCode,
        Json<ApiResponse<user_delivery_assignment::Model>>,
    ),
    ServiceError,
> {
    let assignment = state
        .services
        .assignments
        .assign(request, admin.0.actor(), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(assignment))))
}

pub async fn reassign(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<ReassignRequest>,
) -> ApiResult<user_delivery_assignment::Model> {
    let assignment = state
        .services
        .assignments
        .reassign(request, admin.0.actor(), Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(assignment)))
}

pub async fn remove_assignment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state
        .services
        .assignments
        .remove(customer_id, Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "removed": true }),
    )))
}

pub async fn bulk_transfer(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<BulkTransferRequest>,
) -> ApiResult<serde_json::Value> {
    let moved = state
        .services
        .assignments
        .bulk_transfer(request, admin.0.actor(), Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "customers_moved": moved }),
    )))
}

pub async fn sequence_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<SequenceUsersRequest>,
) -> ApiResult<serde_json::Value> {
    state.services.assignments.sequence_users(request).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "updated": true }),
    )))
}

pub async fn sequence_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<SequenceOrdersRequest>,
) -> ApiResult<serde_json::Value> {
    state.services.assignments.sequence_orders(request).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "updated": true }),
    )))
}

pub async fn assignment_history(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Vec<user_delivery_assignment::Model>> {
    let history = state
        .services
        .assignments
        .history_for_customer(customer_id)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

// ---- Payment verification ----

pub async fn pending_payments(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<PaymentSessionResponse>> {
    let pending = state.services.payments.pending_verifications().await?;
    Ok(Json(ApiResponse::success(pending)))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<PaymentSessionResponse> {
    let session = state
        .services
        .payments
        .verify(id, admin.0.actor(), Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

pub async fn reject_payment(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<PaymentSessionResponse> {
    let session = state
        .services
        .payments
        .reject(id, admin.0.actor(), Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

// ---- Reporting ----

pub async fn dashboard_summary(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<DashboardSummary> {
    let summary = state
        .services
        .reports
        .dashboard_summary(Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}
