use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::handlers::PaginationParams;
use crate::services::catalog::{CreateProductRequest, ProductListResponse, UpdateProductRequest};
use crate::{entities::product, errors::ServiceError, ApiResponse, ApiResult, AppState};

/// Storefront product listing (active and out-of-stock, never hidden ones).
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses((status = 200, description = "Product listing")),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<ProductListResponse> {
    let listing = state
        .services
        .catalog
        .list_storefront(pagination.page, pagination.per_page)
        .await?;
    Ok(Json(ApiResponse::success(listing)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    responses(
        (status = 200, description = "Product detail"),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product::Model> {
    let product = state.services.catalog.get(id).await?;
    if product.status == product::ProductStatus::Inactive {
        return Err(ServiceError::NotFound(format!("Product {} not found", id)));
    }
    Ok(Json(ApiResponse::success(product)))
}

// ---- Admin surface ----

pub async fn admin_list_products(
    State(state): State<AppState>,
    _admin: crate::auth::AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<ProductListResponse> {
    let listing = state
        .services
        .catalog
        .list_all(pagination.page, pagination.per_page)
        .await?;
    Ok(Json(ApiResponse::success(listing)))
}

pub async fn admin_create_product(
    State(state): State<AppState>,
    _admin: crate::auth::AdminUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), ServiceError> {
    let created = state.services.catalog.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn admin_update_product(
    State(state): State<AppState>,
    _admin: crate::auth::AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> ApiResult<product::Model> {
    let updated = state.services.catalog.update(id, request).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct AdjustStockRequest {
    pub stock_quantity: i32,
}

pub async fn admin_adjust_stock(
    State(state): State<AppState>,
    _admin: crate::auth::AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustStockRequest>,
) -> ApiResult<product::Model> {
    let updated = state
        .services
        .stock
        .adjust_stock(id, request.stock_quantity)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}
