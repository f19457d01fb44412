use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mapping of a customer to the delivery person who serves them.
///
/// At most one assignment per customer is active at a time (a partial
/// unique index enforces this in the store); superseded records are
/// deactivated, never deleted, so the history remains auditable.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_delivery_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub customer_id: Uuid,
    pub delivery_boy_id: Uuid,

    pub is_active: bool,

    /// Shifts this assignment applies to, comma-separated ("morning,evening")
    pub shifts: Option<String>,
    /// Areas this assignment applies to, comma-separated
    pub areas: Option<String>,
    pub notes: Option<String>,

    /// Position of this customer in the delivery person's round
    pub sequence: Option<i32>,

    /// Who created the assignment; the string codec of `Actor`
    pub assigned_by: String,

    pub created_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn assigned_by_actor(&self) -> Option<super::Actor> {
        self.assigned_by.parse().ok()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::delivery_boy::Entity",
        from = "Column::DeliveryBoyId",
        to = "super::delivery_boy::Column::Id"
    )]
    DeliveryBoy,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::delivery_boy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryBoy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
