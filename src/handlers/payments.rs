use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::services::payments::{
    CompleteSessionRequest, CreateSessionRequest, PaymentSessionResponse,
};
use crate::{errors::ServiceError, ApiResponse, ApiResult, AppState};

/// Open a UPI payment session over one or more unpaid orders.
#[utoipa::path(
    post,
    path = "/api/v1/payments/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created with UPI deep link and QR"),
        (status = 409, description = "Order already in a session", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentSessionResponse>>), ServiceError> {
    let customer_id = user.customer_id()?;
    let session = state
        .services
        .payments
        .create_session(customer_id, request, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}

/// Report the UPI transaction id for a session.
#[utoipa::path(
    post,
    path = "/api/v1/payments/sessions/{id}/complete",
    request_body = CompleteSessionRequest,
    responses(
        (status = 200, description = "Session completed, awaiting verification"),
        (status = 410, description = "Session expired", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn complete_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteSessionRequest>,
) -> ApiResult<PaymentSessionResponse> {
    let customer_id = user.customer_id()?;
    let session = state
        .services
        .payments
        .complete(customer_id, id, request, Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/sessions/{id}",
    responses((status = 200, description = "Session detail")),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<PaymentSessionResponse> {
    let customer_id = user.customer_id()?;
    let session = state
        .services
        .payments
        .get_session_for_customer(customer_id, id)
        .await?;
    Ok(Json(ApiResponse::success(session)))
}
