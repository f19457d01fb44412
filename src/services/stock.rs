use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::order_item,
    entities::product::{self, Entity as ProductEntity, ProductStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Stock ledger operations over `Product.stock_quantity`.
///
/// Decrements are conditional single-statement updates
/// (`stock = stock - n WHERE stock >= n`), so two concurrent confirmations
/// against the same low-stock product cannot both pass a stale read check.
/// The caller wraps multi-item commits in a transaction, which makes a
/// confirmation atomic across all line items of one order.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Commits stock for every line item of an order, all-or-nothing within
    /// the caller's transaction. On a shortfall the error names the product
    /// and the quantity still available; the caller must roll back.
    pub async fn commit_for_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        items: &[order_item::Model],
    ) -> Result<(), ServiceError> {
        for item in items {
            let result = ProductEntity::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).sub(item.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(Some(Utc::now())))
                .filter(product::Column::Id.eq(item.product_id))
                .filter(product::Column::StockQuantity.gte(item.quantity))
                .filter(product::Column::Status.eq(ProductStatus::Active))
                .exec(conn)
                .await?;

            if result.rows_affected == 0 {
                return Err(self.shortfall_error(conn, item).await);
            }

            // Ledger hit zero: flip the derived status
            ProductEntity::update_many()
                .col_expr(
                    product::Column::Status,
                    Expr::value(ProductStatus::OutOfStock),
                )
                .filter(product::Column::Id.eq(item.product_id))
                .filter(product::Column::StockQuantity.lte(0))
                .filter(product::Column::Status.eq(ProductStatus::Active))
                .exec(conn)
                .await?;
        }
        Ok(())
    }

    /// Returns stock for every line item of a cancelled order and revives
    /// products that were only out of stock because of it.
    pub async fn restore_for_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        items: &[order_item::Model],
    ) -> Result<(), ServiceError> {
        for item in items {
            ProductEntity::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).add(item.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(Some(Utc::now())))
                .filter(product::Column::Id.eq(item.product_id))
                .exec(conn)
                .await?;

            ProductEntity::update_many()
                .col_expr(product::Column::Status, Expr::value(ProductStatus::Active))
                .filter(product::Column::Id.eq(item.product_id))
                .filter(product::Column::StockQuantity.gt(0))
                .filter(product::Column::Status.eq(ProductStatus::OutOfStock))
                .exec(conn)
                .await?;
        }
        Ok(())
    }

    /// Admin edit of the on-hand quantity.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        new_quantity: i32,
    ) -> Result<product::Model, ServiceError> {
        if new_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Stock quantity cannot be negative".to_string(),
            ));
        }

        let existing = ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let old_quantity = existing.stock_quantity;
        let status = product::Model::derived_status(existing.status, new_quantity);

        ProductEntity::update_many()
            .col_expr(product::Column::StockQuantity, Expr::value(new_quantity))
            .col_expr(product::Column::Status, Expr::value(status))
            .col_expr(product::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(product::Column::Id.eq(product_id))
            .exec(&*self.db)
            .await?;

        info!(%product_id, old_quantity, new_quantity, "stock adjusted");

        if let Err(e) = self
            .event_sender
            .send(Event::StockAdjusted {
                product_id,
                old_quantity,
                new_quantity,
            })
            .await
        {
            tracing::warn!(error = %e, %product_id, "failed to send stock adjusted event");
        }

        ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    async fn shortfall_error<C: ConnectionTrait>(
        &self,
        conn: &C,
        item: &order_item::Model,
    ) -> ServiceError {
        match ProductEntity::find_by_id(item.product_id).one(conn).await {
            Ok(Some(p)) if p.status == ProductStatus::Inactive => ServiceError::InsufficientStock(
                format!("{} is no longer available", p.name),
            ),
            Ok(Some(p)) => ServiceError::InsufficientStock(format!(
                "{}: {} available",
                p.name, p.stock_quantity
            )),
            Ok(None) => {
                ServiceError::NotFound(format!("Product {} not found", item.product_id))
            }
            Err(e) => ServiceError::DatabaseError(e),
        }
    }
}
