use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::customer,
    entities::delivery_boy,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::user_delivery_assignment::{self, Entity as AssignmentEntity},
    entities::Actor,
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Request/response types for the assignment manager

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRequest {
    pub customer_id: Uuid,
    pub delivery_boy_id: Uuid,
    pub shifts: Option<String>,
    pub areas: Option<String>,
    pub notes: Option<String>,
    pub sequence: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReassignMode {
    /// Replace the standing assignment and move every open order
    Entire,
    /// Keep the standing assignment; move only orders created in the range
    DateRange,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReassignRequest {
    pub customer_id: Uuid,
    pub to_delivery_boy_id: Uuid,
    pub mode: ReassignMode,
    /// Required for `date_range` mode
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkTransferRequest {
    pub from_delivery_boy_id: Uuid,
    pub to_delivery_boy_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SequenceUsersRequest {
    pub delivery_boy_id: Uuid,
    pub entries: Vec<SequenceEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SequenceEntry {
    pub customer_id: Uuid,
    pub sequence: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SequenceOrdersRequest {
    pub customer_id: Uuid,
    pub entries: Vec<OrderSequenceEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderSequenceEntry {
    pub order_id: Uuid,
    pub sequence: i32,
}

/// Maintains the customer -> delivery-person mapping and keeps in-flight
/// orders consistent with it. At most one assignment per customer is active
/// at a time; history is retained by deactivating records, never deleting.
#[derive(Clone)]
pub struct AssignmentService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl AssignmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// The customer's current active assignment, if any.
    pub async fn active_assignment_for(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<user_delivery_assignment::Model>, ServiceError> {
        AssignmentEntity::find()
            .filter(user_delivery_assignment::Column::CustomerId.eq(customer_id))
            .filter(user_delivery_assignment::Column::IsActive.eq(true))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Delivery person currently serving the customer, used to stamp new
    /// orders at creation time.
    pub async fn active_delivery_boy_for(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<Uuid>, ServiceError> {
        Ok(self
            .active_assignment_for(customer_id)
            .await?
            .map(|a| a.delivery_boy_id))
    }

    /// Active assignments of one delivery person, in round order.
    pub async fn active_assignments_for_delivery_boy(
        &self,
        delivery_boy_id: Uuid,
    ) -> Result<Vec<user_delivery_assignment::Model>, ServiceError> {
        AssignmentEntity::find()
            .filter(user_delivery_assignment::Column::DeliveryBoyId.eq(delivery_boy_id))
            .filter(user_delivery_assignment::Column::IsActive.eq(true))
            .order_by_asc(user_delivery_assignment::Column::Sequence)
            .order_by_asc(user_delivery_assignment::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Full assignment history of a customer, newest first.
    pub async fn history_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<user_delivery_assignment::Model>, ServiceError> {
        AssignmentEntity::find()
            .filter(user_delivery_assignment::Column::CustomerId.eq(customer_id))
            .order_by_desc(user_delivery_assignment::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Assigns a delivery person to a customer. Any previous assignment is
    /// deactivated and the customer's open, still-unassigned orders are
    /// stamped immediately.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, delivery_boy_id = %request.delivery_boy_id))]
    pub async fn assign(
        &self,
        request: AssignRequest,
        assigned_by: Actor,
        now: DateTime<Utc>,
    ) -> Result<user_delivery_assignment::Model, ServiceError> {
        self.ensure_customer_exists(request.customer_id).await?;
        self.ensure_delivery_boy_active(request.delivery_boy_id)
            .await?;

        let txn = self.db.begin().await?;

        deactivate_active(&txn, request.customer_id, now).await?;

        let assignment = user_delivery_assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(request.customer_id),
            delivery_boy_id: Set(request.delivery_boy_id),
            is_active: Set(true),
            shifts: Set(request.shifts),
            areas: Set(request.areas),
            notes: Set(request.notes),
            sequence: Set(request.sequence),
            assigned_by: Set(assigned_by.to_string()),
            created_at: Set(now),
            deactivated_at: Set(None),
        };
        let inserted = assignment.insert(&txn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict(
                    "Customer already has an active delivery assignment".to_string(),
                )
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        propagate_assignment_to_open_orders(
            &txn,
            request.customer_id,
            Some(request.delivery_boy_id),
            true,
            now,
        )
        .await?;

        txn.commit().await?;

        info!(
            customer_id = %request.customer_id,
            delivery_boy_id = %request.delivery_boy_id,
            "delivery assignment created"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::AssignmentCreated {
                customer_id: request.customer_id,
                delivery_boy_id: request.delivery_boy_id,
            })
            .await
        {
            warn!(error = %e, "failed to send assignment created event");
        }

        Ok(inserted)
    }

    /// Reassigns a customer to another delivery person.
    ///
    /// `Entire` replaces the standing assignment and moves all open orders;
    /// `DateRange` leaves the standing assignment alone, moves only orders
    /// created inside the window, and records an inactive assignment purely
    /// for the audit trail.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, to = %request.to_delivery_boy_id, mode = ?request.mode))]
    pub async fn reassign(
        &self,
        request: ReassignRequest,
        assigned_by: Actor,
        now: DateTime<Utc>,
    ) -> Result<user_delivery_assignment::Model, ServiceError> {
        self.ensure_customer_exists(request.customer_id).await?;
        self.ensure_delivery_boy_active(request.to_delivery_boy_id)
            .await?;

        let txn = self.db.begin().await?;

        let inserted = match request.mode {
            ReassignMode::Entire => {
                deactivate_active(&txn, request.customer_id, now).await?;

                let assignment = user_delivery_assignment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(request.customer_id),
                    delivery_boy_id: Set(request.to_delivery_boy_id),
                    is_active: Set(true),
                    shifts: Set(None),
                    areas: Set(None),
                    notes: Set(request.notes.clone()),
                    sequence: Set(None),
                    assigned_by: Set(assigned_by.to_string()),
                    created_at: Set(now),
                    deactivated_at: Set(None),
                };
                let inserted = assignment.insert(&txn).await?;

                propagate_assignment_to_open_orders(
                    &txn,
                    request.customer_id,
                    Some(request.to_delivery_boy_id),
                    false,
                    now,
                )
                .await?;

                inserted
            }
            ReassignMode::DateRange => {
                let (from, to) = match (request.from, request.to) {
                    (Some(from), Some(to)) if from <= to => (from, to),
                    _ => {
                        return Err(ServiceError::ValidationError(
                            "date_range reassignment requires a valid from/to window".to_string(),
                        ))
                    }
                };

                // Historical record only; the standing assignment stays.
                let assignment = user_delivery_assignment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(request.customer_id),
                    delivery_boy_id: Set(request.to_delivery_boy_id),
                    is_active: Set(false),
                    shifts: Set(None),
                    areas: Set(None),
                    notes: Set(Some(format!(
                        "date-range reassignment {} to {}{}",
                        from.format("%Y-%m-%d"),
                        to.format("%Y-%m-%d"),
                        request
                            .notes
                            .as_deref()
                            .map(|n| format!(": {}", n))
                            .unwrap_or_default()
                    ))),
                    sequence: Set(None),
                    assigned_by: Set(assigned_by.to_string()),
                    created_at: Set(now),
                    deactivated_at: Set(Some(now)),
                };
                let inserted = assignment.insert(&txn).await?;

                OrderEntity::update_many()
                    .col_expr(
                        order::Column::DeliveryBoyId,
                        Expr::value(Some(request.to_delivery_boy_id)),
                    )
                    .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
                    .filter(order::Column::CustomerId.eq(request.customer_id))
                    .filter(
                        order::Column::Status
                            .is_in([OrderStatus::Pending, OrderStatus::Confirmed]),
                    )
                    .filter(order::Column::CreatedAt.gte(from))
                    .filter(order::Column::CreatedAt.lte(to))
                    .exec(&txn)
                    .await?;

                inserted
            }
        };

        txn.commit().await?;

        info!(customer_id = %request.customer_id, "customer reassigned");

        if let Err(e) = self
            .event_sender
            .send(Event::AssignmentCreated {
                customer_id: request.customer_id,
                delivery_boy_id: request.to_delivery_boy_id,
            })
            .await
        {
            warn!(error = %e, "failed to send reassignment event");
        }

        Ok(inserted)
    }

    /// Removes the customer's assignment and returns their open orders to
    /// the unassigned pool.
    #[instrument(skip(self))]
    pub async fn remove(&self, customer_id: Uuid, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let active = self
            .active_assignment_for(customer_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Customer {} has no active delivery assignment",
                    customer_id
                ))
            })?;

        let txn = self.db.begin().await?;

        let mut model: user_delivery_assignment::ActiveModel = active.into();
        model.is_active = Set(false);
        model.deactivated_at = Set(Some(now));
        model.update(&txn).await?;

        propagate_assignment_to_open_orders(&txn, customer_id, None, false, now).await?;

        txn.commit().await?;

        info!(%customer_id, "delivery assignment removed");

        if let Err(e) = self
            .event_sender
            .send(Event::AssignmentRemoved { customer_id })
            .await
        {
            warn!(error = %e, "failed to send assignment removed event");
        }

        Ok(())
    }

    /// Moves every customer of one delivery person to another, cascading to
    /// their open orders. Intended for covering absences.
    #[instrument(skip(self, request), fields(from = %request.from_delivery_boy_id, to = %request.to_delivery_boy_id))]
    pub async fn bulk_transfer(
        &self,
        request: BulkTransferRequest,
        assigned_by: Actor,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        if request.from_delivery_boy_id == request.to_delivery_boy_id {
            return Err(ServiceError::ValidationError(
                "Source and target delivery persons must differ".to_string(),
            ));
        }
        self.ensure_delivery_boy_active(request.to_delivery_boy_id)
            .await?;

        let txn = self.db.begin().await?;

        let moved = AssignmentEntity::find()
            .filter(
                user_delivery_assignment::Column::DeliveryBoyId.eq(request.from_delivery_boy_id),
            )
            .filter(user_delivery_assignment::Column::IsActive.eq(true))
            .all(&txn)
            .await?;

        for assignment in &moved {
            let mut deactivated: user_delivery_assignment::ActiveModel =
                assignment.clone().into();
            deactivated.is_active = Set(false);
            deactivated.deactivated_at = Set(Some(now));
            deactivated.update(&txn).await?;

            let replacement = user_delivery_assignment::ActiveModel {
                id: Set(Uuid::new_v4()),
                customer_id: Set(assignment.customer_id),
                delivery_boy_id: Set(request.to_delivery_boy_id),
                is_active: Set(true),
                shifts: Set(assignment.shifts.clone()),
                areas: Set(assignment.areas.clone()),
                notes: Set(request.notes.clone()),
                sequence: Set(assignment.sequence),
                assigned_by: Set(assigned_by.to_string()),
                created_at: Set(now),
                deactivated_at: Set(None),
            };
            replacement.insert(&txn).await?;
        }

        // Cascade all of the source's open orders in one statement
        OrderEntity::update_many()
            .col_expr(
                order::Column::DeliveryBoyId,
                Expr::value(Some(request.to_delivery_boy_id)),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(order::Column::DeliveryBoyId.eq(request.from_delivery_boy_id))
            .filter(order::Column::Status.is_in([OrderStatus::Pending, OrderStatus::Confirmed]))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        let customers_moved = moved.len() as u64;
        info!(customers_moved, "bulk transfer complete");

        if let Err(e) = self
            .event_sender
            .send(Event::AssignmentsTransferred {
                from_delivery_boy_id: request.from_delivery_boy_id,
                to_delivery_boy_id: request.to_delivery_boy_id,
                customers_moved,
            })
            .await
        {
            warn!(error = %e, "failed to send bulk transfer event");
        }

        Ok(customers_moved)
    }

    /// Writes the admin-chosen ordering of a delivery person's customers.
    #[instrument(skip(self, request), fields(delivery_boy_id = %request.delivery_boy_id))]
    pub async fn sequence_users(
        &self,
        request: SequenceUsersRequest,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        for entry in &request.entries {
            AssignmentEntity::update_many()
                .col_expr(
                    user_delivery_assignment::Column::Sequence,
                    Expr::value(Some(entry.sequence)),
                )
                .filter(
                    user_delivery_assignment::Column::DeliveryBoyId.eq(request.delivery_boy_id),
                )
                .filter(user_delivery_assignment::Column::CustomerId.eq(entry.customer_id))
                .filter(user_delivery_assignment::Column::IsActive.eq(true))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    /// Writes the admin-chosen ordering of one customer's orders.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn sequence_orders(
        &self,
        request: SequenceOrdersRequest,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        for entry in &request.entries {
            OrderEntity::update_many()
                .col_expr(
                    order::Column::DeliverySequence,
                    Expr::value(Some(entry.sequence)),
                )
                .filter(order::Column::Id.eq(entry.order_id))
                .filter(order::Column::CustomerId.eq(request.customer_id))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn ensure_customer_exists(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        customer::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
    }

    async fn ensure_delivery_boy_active(
        &self,
        delivery_boy_id: Uuid,
    ) -> Result<(), ServiceError> {
        let boy = delivery_boy::Entity::find_by_id(delivery_boy_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Delivery person {} not found", delivery_boy_id))
            })?;
        if !boy.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Delivery person {} is inactive",
                boy.name
            )));
        }
        Ok(())
    }
}

/// The single code path that stamps (or strips) the delivery person on a
/// customer's open orders; every assign/reassign/remove/transfer routes
/// through it so the rules cannot drift apart.
async fn propagate_assignment_to_open_orders<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    delivery_boy_id: Option<Uuid>,
    only_unassigned: bool,
    now: DateTime<Utc>,
) -> Result<u64, ServiceError> {
    let mut update = OrderEntity::update_many()
        .col_expr(order::Column::DeliveryBoyId, Expr::value(delivery_boy_id))
        .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
        .filter(order::Column::CustomerId.eq(customer_id))
        .filter(order::Column::Status.is_in([OrderStatus::Pending, OrderStatus::Confirmed]));
    if only_unassigned {
        update = update.filter(order::Column::DeliveryBoyId.is_null());
    }
    let result = update.exec(conn).await?;
    Ok(result.rows_affected)
}

async fn deactivate_active<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    AssignmentEntity::update_many()
        .col_expr(user_delivery_assignment::Column::IsActive, Expr::value(false))
        .col_expr(
            user_delivery_assignment::Column::DeactivatedAt,
            Expr::value(Some(now)),
        )
        .filter(user_delivery_assignment::Column::CustomerId.eq(customer_id))
        .filter(user_delivery_assignment::Column::IsActive.eq(true))
        .exec(conn)
        .await?;
    Ok(())
}
