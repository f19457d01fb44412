use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::delivery_boy,
    entities::order::{
        self, compute_total, DeliveryShift, Entity as OrderEntity, Model as OrderModel,
        OrderPaymentStatus, OrderPriority, OrderStatus, PaymentMethod,
    },
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::assignments::AssignmentService,
    services::stock::StockService,
    slots,
};

/// Pricing knobs applied to every order at creation time.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    pub shipping_fee: Decimal,
    pub tax_rate: Decimal,
}

/// Request/response types for the order service

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<CreateOrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub delivery_shift: DeliveryShift,
    pub delivery_date: NaiveDate,
    #[validate(length(max = 500, message = "Notes cannot exceed 500 characters"))]
    pub customer_notes: Option<String>,
    pub priority: Option<OrderPriority>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 4, max = 10))]
    pub postal_code: String,
    #[validate(length(min = 7, max = 15))]
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct MarkDeliveredRequest {
    #[validate(length(max = 500))]
    pub delivery_notes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub delivery_shift: DeliveryShift,
    pub delivery_date: NaiveDate,
    pub customer_notes: Option<String>,
    pub admin_notes: Option<String>,
    pub priority: OrderPriority,
    pub delivery_boy_id: Option<Uuid>,
    pub delivery_sequence: Option<i32>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_notes: Option<String>,
    pub items: Vec<order_item::Model>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// One customer's group in a delivery person's route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkQueueGroup {
    pub customer_id: Uuid,
    pub sequence: Option<i32>,
    pub orders: Vec<OrderResponse>,
}

#[derive(Debug, Default, Clone)]
pub struct AdminOrderFilter {
    pub status: Option<OrderStatus>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_boy_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

/// Service owning the order lifecycle state machine.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    stock: Arc<StockService>,
    assignments: Arc<AssignmentService>,
    pricing: PricingPolicy,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        stock: Arc<StockService>,
        assignments: Arc<AssignmentService>,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            db,
            event_sender,
            stock,
            assignments,
            pricing,
        }
    }

    /// Creates a new order for `customer_id` as of `now`.
    ///
    /// Stock is checked but not committed here; it is only deducted when an
    /// admin confirms the order. Prices are frozen onto the line items.
    #[instrument(skip(self, request), fields(customer_id = %customer_id))]
    pub async fn create_order(
        &self,
        customer_id: Uuid,
        request: CreateOrderRequest,
        now: DateTime<Utc>,
    ) -> Result<OrderResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        request
            .shipping_address
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        for item in &request.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "Item quantity must be at least 1".to_string(),
                ));
            }
        }

        slots::validate_slot(request.delivery_date, request.delivery_shift, now)
            .map_err(|rejection| ServiceError::SlotUnavailable(rejection.to_string()))?;

        let order_id = Uuid::new_v4();
        let order_number = generate_order_number(now);

        // Availability check and price snapshot; no decrement yet.
        let mut items = Vec::with_capacity(request.items.len());
        let mut subtotal = Decimal::ZERO;
        for line in &request.items {
            let product = ProductEntity::find_by_id(line.product_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;

            if product.status == product::ProductStatus::Inactive {
                return Err(ServiceError::ValidationError(format!(
                    "{} is not available",
                    product.name
                )));
            }
            if !product.can_fulfil(line.quantity) {
                return Err(ServiceError::InsufficientStock(format!(
                    "{}: {} available",
                    product.name, product.stock_quantity
                )));
            }

            let unit_price = product.selling_price();
            let line_total = unit_price * Decimal::from(line.quantity);
            subtotal += line_total;

            items.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                name: Set(product.name.clone()),
                unit_price: Set(unit_price),
                quantity: Set(line.quantity),
                image_url: Set(product.image_url.clone()),
                line_total: Set(line_total),
            });
        }

        let tax = (subtotal * self.pricing.tax_rate).round_dp(2);
        let discount = Decimal::ZERO;
        let total_amount = compute_total(subtotal, self.pricing.shipping_fee, tax, discount);

        // A standing assignment stamps the delivery person immediately,
        // without waiting for admin confirmation.
        let delivery_boy_id = self
            .assignments
            .active_delivery_boy_for(customer_id)
            .await?;

        let shipping_address = serde_json::to_string(&request.shipping_address)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            customer_id: Set(customer_id),
            status: Set(OrderStatus::Pending),
            payment_status: Set(OrderPaymentStatus::Pending),
            payment_method: Set(request.payment_method),
            subtotal: Set(subtotal),
            shipping_fee: Set(self.pricing.shipping_fee),
            tax: Set(tax),
            discount: Set(discount),
            total_amount: Set(total_amount),
            shipping_address: Set(shipping_address),
            delivery_shift: Set(request.delivery_shift),
            delivery_date: Set(request.delivery_date),
            customer_notes: Set(request.customer_notes.clone()),
            admin_notes: Set(None),
            priority: Set(request.priority.unwrap_or(OrderPriority::Normal)),
            delivery_boy_id: Set(delivery_boy_id),
            delivery_sequence: Set(None),
            delivered_at: Set(None),
            delivery_notes: Set(None),
            delivery_latitude: Set(None),
            delivery_longitude: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };

        let inserted = order_model.insert(&txn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict(format!(
                    "Order number {} already exists, please retry",
                    order_number
                ))
            } else {
                error!(error = %e, %order_id, "failed to create order");
                ServiceError::DatabaseError(e)
            }
        })?;

        let mut item_models = Vec::with_capacity(items.len());
        for item in items {
            item_models.push(item.insert(&txn).await?);
        }

        txn.commit().await?;

        info!(%order_id, %order_number, customer_id = %customer_id, "order created");

        if let Err(e) = self.event_sender.send(Event::OrderCreated(order_id)).await {
            warn!(error = %e, %order_id, "failed to send order created event");
        }

        Ok(to_response(inserted, item_models))
    }

    /// Admin transition of the order state machine.
    ///
    /// `pending -> confirmed` commits stock atomically across every line
    /// item; any shortfall rejects the whole update. `confirmed ->
    /// cancelled` restores stock. Terminal states reject all transitions,
    /// which also makes a repeated confirmation a no-op refusal rather than
    /// a double decrement.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = ?new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        admin_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = existing.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot transition from '{}' to '{}'",
                old_status.as_str(),
                new_status.as_str()
            )));
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        match (old_status, new_status) {
            (OrderStatus::Pending, OrderStatus::Confirmed) => {
                // Re-validate at confirmation time; prices and stock may
                // have drifted since placement. Dropping the transaction on
                // error rolls back any decrements already applied.
                self.stock.commit_for_items(&txn, &items).await?;
            }
            (OrderStatus::Confirmed, OrderStatus::Cancelled) => {
                self.stock.restore_for_items(&txn, &items).await?;
            }
            // pending -> cancelled: nothing was ever deducted
            _ => {}
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(new_status);
        if new_status == OrderStatus::Delivered {
            active.delivered_at = Set(Some(now));
        }
        if let Some(notes) = admin_notes {
            active.admin_notes = Set(Some(notes));
        }
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            %order_id,
            old_status = old_status.as_str(),
            new_status = new_status.as_str(),
            "order status updated"
        );

        let event = match new_status {
            OrderStatus::Confirmed => Some(Event::OrderConfirmed(order_id)),
            OrderStatus::Cancelled => Some(Event::OrderCancelled {
                order_id,
                cancelled_from: old_status.as_str().to_string(),
            }),
            _ => None,
        };
        if let Some(event) = event {
            if let Err(e) = self.event_sender.send(event).await {
                warn!(error = %e, %order_id, "failed to send order status event");
            }
        }

        Ok(to_response(updated, items))
    }

    /// Customer cancellation, gated by ownership, status and the shift
    /// cutoff. A confirmed order restores stock exactly as the admin path.
    #[instrument(skip(self), fields(order_id = %order_id, customer_id = %customer_id))]
    pub async fn cancel_order(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if existing.customer_id != customer_id {
            return Err(ServiceError::Forbidden(
                "This order belongs to another customer".to_string(),
            ));
        }

        let old_status = existing.status;
        if !old_status.can_transition_to(OrderStatus::Cancelled) {
            return Err(ServiceError::InvalidOperation(format!(
                "A {} order can no longer be cancelled",
                old_status.as_str()
            )));
        }

        if !existing.cancellation_window_open(now) {
            return Err(ServiceError::CancellationWindowClosed(format!(
                "{} orders can be cancelled until {}",
                existing.delivery_shift.as_str(),
                existing.cancellation_deadline().format("%H:%M on %d %b"),
            )));
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        if old_status == OrderStatus::Confirmed {
            self.stock.restore_for_items(&txn, &items).await?;
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(OrderStatus::Cancelled);
        if let Some(reason) = reason {
            active.customer_notes = Set(Some(reason));
        }
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(%order_id, from = old_status.as_str(), "order cancelled by customer");

        if let Err(e) = self
            .event_sender
            .send(Event::OrderCancelled {
                order_id,
                cancelled_from: old_status.as_str().to_string(),
            })
            .await
        {
            warn!(error = %e, %order_id, "failed to send order cancelled event");
        }

        Ok(to_response(updated, items))
    }

    /// Delivery-person action: mark a confirmed, assigned order delivered.
    /// Only valid while the local civil time is inside the shift's window.
    #[instrument(skip(self, request), fields(order_id = %order_id, delivery_boy_id = %delivery_boy_id))]
    pub async fn mark_delivered(
        &self,
        delivery_boy_id: Uuid,
        order_id: Uuid,
        request: MarkDeliveredRequest,
        now: DateTime<Utc>,
    ) -> Result<OrderResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let txn = self.db.begin().await?;

        let existing = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if existing.delivery_boy_id != Some(delivery_boy_id) {
            return Err(ServiceError::Forbidden(
                "This order is not assigned to you".to_string(),
            ));
        }
        if existing.status != OrderStatus::Confirmed {
            return Err(ServiceError::InvalidOperation(format!(
                "Only confirmed orders can be delivered (order is {})",
                existing.status.as_str()
            )));
        }
        if !existing.can_be_marked_as_delivered(now) {
            let (start, end) = existing.delivery_shift.delivery_window();
            return Err(ServiceError::DeliveryWindowClosed(format!(
                "{} orders can only be delivered between {} and {}",
                existing.delivery_shift.as_str(),
                start.format("%H:%M"),
                end.format("%H:%M"),
            )));
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(OrderStatus::Delivered);
        active.delivered_at = Set(Some(now));
        active.delivery_notes = Set(request.delivery_notes.clone());
        active.delivery_latitude = Set(request.latitude);
        active.delivery_longitude = Set(request.longitude);
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);

        let updated = active.update(&txn).await?;

        delivery_boy::Entity::update_many()
            .col_expr(
                delivery_boy::Column::TotalDeliveries,
                Expr::col(delivery_boy::Column::TotalDeliveries).add(1),
            )
            .filter(delivery_boy::Column::Id.eq(delivery_boy_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(%order_id, %delivery_boy_id, "order marked delivered");

        if let Err(e) = self
            .event_sender
            .send(Event::OrderDelivered {
                order_id,
                delivery_boy_id,
            })
            .await
        {
            warn!(error = %e, %order_id, "failed to send order delivered event");
        }

        Ok(to_response(updated, items))
    }

    /// A delivery person's queue for one day: confirmed orders grouped by
    /// customer, customers ordered by their assignment sequence (falling
    /// back to assignment age), orders within a group by their own sequence
    /// (falling back to creation time).
    #[instrument(skip(self))]
    pub async fn work_queue(
        &self,
        delivery_boy_id: Uuid,
        delivery_date: NaiveDate,
    ) -> Result<Vec<WorkQueueGroup>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::DeliveryBoyId.eq(delivery_boy_id))
            .filter(order::Column::Status.eq(OrderStatus::Confirmed))
            .filter(order::Column::DeliveryDate.eq(delivery_date))
            .order_by_asc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let assignments = self
            .assignments
            .active_assignments_for_delivery_boy(delivery_boy_id)
            .await?;
        let assignment_rank: HashMap<Uuid, (i32, DateTime<Utc>)> = assignments
            .iter()
            .map(|a| {
                (
                    a.customer_id,
                    (a.sequence.unwrap_or(i32::MAX), a.created_at),
                )
            })
            .collect();

        let mut grouped: HashMap<Uuid, Vec<OrderModel>> = HashMap::new();
        for order in orders {
            grouped.entry(order.customer_id).or_default().push(order);
        }

        let mut groups: Vec<(Uuid, Vec<OrderModel>)> = grouped.into_iter().collect();
        groups.sort_by_key(|(customer_id, _)| {
            assignment_rank
                .get(customer_id)
                .copied()
                .unwrap_or((i32::MAX, DateTime::<Utc>::MAX_UTC))
        });

        let mut result = Vec::with_capacity(groups.len());
        for (customer_id, mut orders) in groups {
            orders.sort_by_key(|o| (o.delivery_sequence.unwrap_or(i32::MAX), o.created_at));
            let sequence = assignment_rank
                .get(&customer_id)
                .map(|(seq, _)| *seq)
                .filter(|seq| *seq != i32::MAX);

            let mut responses = Vec::with_capacity(orders.len());
            for order in orders {
                let items = OrderItemEntity::find()
                    .filter(order_item::Column::OrderId.eq(order.id))
                    .all(&*self.db)
                    .await?;
                responses.push(to_response(order, items));
            }
            result.push(WorkQueueGroup {
                customer_id,
                sequence,
                orders: responses,
            });
        }

        Ok(result)
    }

    /// Updates the admin notes. Notes are the one field that stays mutable
    /// after an order reaches a terminal state.
    #[instrument(skip(self, notes))]
    pub async fn update_admin_notes(
        &self,
        order_id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<OrderResponse, ServiceError> {
        let existing = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let mut active: order::ActiveModel = existing.into();
        active.admin_notes = Set(notes);
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        let updated = active.update(&*self.db).await?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(to_response(updated, items))
    }

    /// Retrieves an order with its items.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(to_response(order, items))
    }

    /// Retrieves an order, enforcing customer ownership.
    pub async fn get_order_for_customer(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let response = self.get_order(order_id).await?;
        if response.customer_id != customer_id {
            return Err(ServiceError::Forbidden(
                "This order belongs to another customer".to_string(),
            ));
        }
        Ok(response)
    }

    pub async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<OrderResponse, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", order_number))
            })?;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;
        Ok(to_response(order, items))
    }

    /// Lists a customer's own orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let paginator = OrderEntity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        let orders = self.attach_items(orders).await?;

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Admin listing with optional filters, newest first.
    #[instrument(skip(self))]
    pub async fn list_admin(
        &self,
        filter: AdminOrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(date) = filter.delivery_date {
            query = query.filter(order::Column::DeliveryDate.eq(date));
        }
        if let Some(boy) = filter.delivery_boy_id {
            query = query.filter(order::Column::DeliveryBoyId.eq(boy));
        }
        if let Some(customer) = filter.customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        let orders = self.attach_items(orders).await?;

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    async fn attach_items(
        &self,
        orders: Vec<OrderModel>,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<order_item::Model>> = HashMap::new();
        if !order_ids.is_empty() {
            let items = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.is_in(order_ids))
                .all(&*self.db)
                .await?;
            for item in items {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }
        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                to_response(order, items)
            })
            .collect())
    }
}

fn to_response(model: OrderModel, items: Vec<order_item::Model>) -> OrderResponse {
    OrderResponse {
        id: model.id,
        order_number: model.order_number,
        customer_id: model.customer_id,
        status: model.status,
        payment_status: model.payment_status,
        payment_method: model.payment_method,
        subtotal: model.subtotal,
        shipping_fee: model.shipping_fee,
        tax: model.tax,
        discount: model.discount,
        total_amount: model.total_amount,
        shipping_address: model.shipping_address,
        delivery_shift: model.delivery_shift,
        delivery_date: model.delivery_date,
        customer_notes: model.customer_notes,
        admin_notes: model.admin_notes,
        priority: model.priority,
        delivery_boy_id: model.delivery_boy_id,
        delivery_sequence: model.delivery_sequence,
        delivered_at: model.delivered_at,
        delivery_notes: model.delivery_notes,
        items,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// Human order number: millisecond timestamp plus a short random suffix.
/// Collisions are vanishingly rare and surface as a retryable conflict.
fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("ORD-{}-{}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_numbers_carry_prefix_and_suffix() {
        let now = Utc::now();
        let number = generate_order_number(now);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 4);
    }

    #[test]
    fn pricing_matches_the_checkout_scenario() {
        // Two units at 60 with a flat 50 shipping fee and no tax
        let subtotal = dec!(60) * Decimal::from(2);
        let total = compute_total(subtotal, dec!(50), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(subtotal, dec!(120));
        assert_eq!(total, dec!(170));
    }

    proptest! {
        #[test]
        fn total_always_equals_component_sum(
            subtotal in 0u32..1_000_000,
            shipping in 0u32..1_000,
            tax in 0u32..10_000,
            discount in 0u32..1_000,
        ) {
            let subtotal = Decimal::from(subtotal);
            let shipping = Decimal::from(shipping);
            let tax = Decimal::from(tax);
            let discount = Decimal::from(discount);
            let total = compute_total(subtotal, shipping, tax, discount);
            prop_assert_eq!(total, subtotal + shipping + tax - discount);
        }
    }
}
