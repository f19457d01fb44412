use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::delivery_boy::{self, Entity as DeliveryBoyEntity},
    entities::order::{self, Entity as OrderEntity, OrderPaymentStatus, OrderStatus},
    entities::payment::{self, Entity as PaymentEntity, PaymentSessionStatus, VerificationStatus},
    entities::product::{self, Entity as ProductEntity},
    entities::user_delivery_assignment::{self, Entity as AssignmentEntity},
    errors::ServiceError,
    slots,
};

const LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusCounts {
    pub pending: u64,
    pub confirmed: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub stock_quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryBoyStats {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub total_deliveries: i32,
    pub active_customers: u64,
}

/// Back-office dashboard aggregate.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub orders: OrderStatusCounts,
    pub deliveries_today: u64,
    pub revenue_paid: Decimal,
    pub pending_payment_verifications: u64,
    pub active_assignments: u64,
    pub low_stock_products: Vec<LowStockProduct>,
    pub delivery_boys: Vec<DeliveryBoyStats>,
    pub generated_at: DateTime<Utc>,
}

/// Read-only aggregation over orders, payments and assignments.
#[derive(Clone)]
pub struct ReportingService {
    db: Arc<DatabaseConnection>,
}

impl ReportingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn dashboard_summary(
        &self,
        now: DateTime<Utc>,
    ) -> Result<DashboardSummary, ServiceError> {
        let counts = futures::future::join_all([
            self.count_orders(OrderStatus::Pending),
            self.count_orders(OrderStatus::Confirmed),
            self.count_orders(OrderStatus::Delivered),
            self.count_orders(OrderStatus::Cancelled),
        ])
        .await;
        let mut counts = counts.into_iter();
        let orders = OrderStatusCounts {
            pending: counts.next().transpose()?.unwrap_or_default(),
            confirmed: counts.next().transpose()?.unwrap_or_default(),
            delivered: counts.next().transpose()?.unwrap_or_default(),
            cancelled: counts.next().transpose()?.unwrap_or_default(),
        };

        let today = slots::to_ist(now).date_naive();
        let deliveries_today = OrderEntity::find()
            .filter(order::Column::Status.eq(OrderStatus::Delivered))
            .filter(order::Column::DeliveryDate.eq(today))
            .count(&*self.db)
            .await?;

        // Summed in Rust to stay backend-agnostic about decimal aggregates
        let paid_totals: Vec<Decimal> = OrderEntity::find()
            .select_only()
            .column(order::Column::TotalAmount)
            .filter(order::Column::PaymentStatus.eq(OrderPaymentStatus::Paid))
            .into_tuple()
            .all(&*self.db)
            .await?;
        let revenue_paid = paid_totals.into_iter().sum();

        let pending_payment_verifications = PaymentEntity::find()
            .filter(payment::Column::Status.eq(PaymentSessionStatus::Completed))
            .filter(payment::Column::VerificationStatus.eq(VerificationStatus::Pending))
            .count(&*self.db)
            .await?;

        let active_assignments = AssignmentEntity::find()
            .filter(user_delivery_assignment::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?;

        let low_stock_products = ProductEntity::find()
            .filter(product::Column::StockQuantity.lt(LOW_STOCK_THRESHOLD))
            .filter(product::Column::Status.ne(product::ProductStatus::Inactive))
            .order_by_asc(product::Column::StockQuantity)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| LowStockProduct {
                id: p.id,
                name: p.name,
                stock_quantity: p.stock_quantity,
            })
            .collect();

        let mut delivery_boys = Vec::new();
        for boy in DeliveryBoyEntity::find()
            .order_by_asc(delivery_boy::Column::Name)
            .all(&*self.db)
            .await?
        {
            let active_customers = AssignmentEntity::find()
                .filter(user_delivery_assignment::Column::DeliveryBoyId.eq(boy.id))
                .filter(user_delivery_assignment::Column::IsActive.eq(true))
                .count(&*self.db)
                .await?;
            delivery_boys.push(DeliveryBoyStats {
                id: boy.id,
                name: boy.name,
                is_active: boy.is_active,
                total_deliveries: boy.total_deliveries,
                active_customers,
            });
        }

        Ok(DashboardSummary {
            orders,
            deliveries_today,
            revenue_paid,
            pending_payment_verifications,
            active_assignments,
            low_stock_products,
            delivery_boys,
            generated_at: now,
        })
    }

    async fn count_orders(&self, status: OrderStatus) -> Result<u64, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::Status.eq(status))
            .count(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
