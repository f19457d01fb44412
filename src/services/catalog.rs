use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::product::{self, Entity as ProductEntity, ProductStatus},
    errors::ServiceError,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i32,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price: Option<Decimal>,
    /// Explicit null clears the discount
    pub discount_price: Option<Option<Decimal>>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<product::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Product catalog CRUD; the stock ledger itself is owned by `StockService`.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Storefront listing: everything except admin-hidden products.
    #[instrument(skip(self))]
    pub async fn list_storefront(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let paginator = ProductEntity::find()
            .filter(product::Column::Status.ne(ProductStatus::Inactive))
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(ProductListResponse {
            products,
            total,
            page,
            per_page,
        })
    }

    /// Admin listing: includes inactive products.
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let paginator = ProductEntity::find()
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(ProductListResponse {
            products,
            total,
            page,
            per_page,
        })
    }

    pub async fn get(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if request.price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price must be positive".to_string(),
            ));
        }
        if let Some(discount) = request.discount_price {
            if discount <= Decimal::ZERO || discount >= request.price {
                return Err(ServiceError::ValidationError(
                    "Discount price must be positive and below the list price".to_string(),
                ));
            }
        }
        if request.stock_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Stock quantity cannot be negative".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let model = product::ActiveModel {
            id: Set(id),
            name: Set(request.name),
            description: Set(request.description),
            unit: Set(request.unit),
            price: Set(request.price),
            discount_price: Set(request.discount_price),
            stock_quantity: Set(request.stock_quantity),
            status: Set(product::Model::derived_status(
                ProductStatus::Active,
                request.stock_quantity,
            )),
            image_url: Set(request.image_url),
            category: Set(request.category),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let inserted = model.insert(&*self.db).await?;
        info!(product_id = %id, "product created");
        Ok(inserted)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let existing = self.get(product_id).await?;
        let mut active: product::ActiveModel = existing.into();

        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit);
        }
        if let Some(price) = request.price {
            if price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Price must be positive".to_string(),
                ));
            }
            active.price = Set(price);
        }
        if let Some(discount) = request.discount_price {
            active.discount_price = Set(discount);
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(category) = request.category {
            active.category = Set(Some(category));
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }

        let updated = active.update(&*self.db).await?;
        info!(product_id = %product_id, "product updated");
        Ok(updated)
    }
}
