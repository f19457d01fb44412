use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::slots::{to_ist, Ist};

/// A customer order. Line items live in `order_item`; the amounts here are
/// derived from them once at creation time and never re-priced afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 50,
        message = "Order number must be between 1 and 50 characters"
    ))]
    pub order_number: String,

    pub customer_id: Uuid,

    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub payment_method: PaymentMethod,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub shipping_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub tax: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount: Decimal,
    /// Always `subtotal + shipping_fee + tax - discount`; recomputed on save
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount: Decimal,

    /// Shipping address snapshot, JSON-encoded at checkout time
    pub shipping_address: String,

    pub delivery_shift: DeliveryShift,
    pub delivery_date: Date,

    pub customer_notes: Option<String>,
    pub admin_notes: Option<String>,

    pub priority: OrderPriority,

    /// Assigned delivery person, stamped by the assignment manager
    pub delivery_boy_id: Option<Uuid>,
    /// Route position within the customer's group of orders
    pub delivery_sequence: Option<i32>,

    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_notes: Option<String>,
    #[sea_orm(nullable)]
    pub delivery_latitude: Option<f64>,
    #[sea_orm(nullable)]
    pub delivery_longitude: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition is defined out of a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The order-lifecycle transition table.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Delivered)
                | (Self::Confirmed, Self::Cancelled)
        )
    }
}

/// Payment progress, an independent axis from fulfilment status.
/// `Processing` marks a UPI session awaiting admin verification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cod")]
    Cod,
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "upi")]
    Upi,
    #[sea_orm(string_value = "wallet")]
    Wallet,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryShift {
    #[sea_orm(string_value = "morning")]
    Morning,
    #[sea_orm(string_value = "evening")]
    Evening,
}

impl DeliveryShift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
        }
    }

    /// Time-of-day window during which orders of this shift are delivered.
    pub fn delivery_window(&self) -> (NaiveTime, NaiveTime) {
        match self {
            Self::Morning => (hms(5, 0), hms(11, 0)),
            Self::Evening => (hms(16, 0), hms(20, 0)),
        }
    }

    pub fn delivery_window_contains(&self, time: NaiveTime) -> bool {
        let (start, end) = self.delivery_window();
        time >= start && time <= end
    }

    /// Latest time of day a customer may cancel an order of this shift.
    /// Morning cancellations close the evening before delivery; evening
    /// cancellations close early afternoon on the delivery day.
    pub fn cancellation_cutoff_time(&self) -> NaiveTime {
        match self {
            Self::Morning => hms(20, 0),
            Self::Evening => hms(14, 0),
        }
    }
}

fn hms(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("window times are valid")
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum OrderPriority {
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

/// The one place the order total is defined.
pub fn compute_total(
    subtotal: Decimal,
    shipping_fee: Decimal,
    tax: Decimal,
    discount: Decimal,
) -> Decimal {
    subtotal + shipping_fee + tax - discount
}

impl Model {
    /// Instant after which the customer may no longer cancel this order.
    pub fn cancellation_deadline(&self) -> DateTime<Ist> {
        let cutoff_date = match self.delivery_shift {
            DeliveryShift::Morning => self.delivery_date - chrono::Days::new(1),
            DeliveryShift::Evening => self.delivery_date,
        };
        crate::slots::ist_datetime(cutoff_date, self.delivery_shift.cancellation_cutoff_time())
    }

    /// Whether the shift cutoff still permits a customer cancellation.
    /// Status checks are the caller's concern; this is the time gate only.
    pub fn cancellation_window_open(&self, now: DateTime<Utc>) -> bool {
        to_ist(now) < self.cancellation_deadline()
    }

    /// Whether this order can be marked delivered at `now`: it must be
    /// confirmed, have an assigned delivery person, and `now` must fall in
    /// the shift's delivery window in local civil time.
    pub fn can_be_marked_as_delivered(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Confirmed
            && self.delivery_boy_id.is_some()
            && self
                .delivery_shift
                .delivery_window_contains(to_ist(now).time())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
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

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
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

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        // The total is always derived from its components, never trusted
        // from the caller.
        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        active_model.total_amount = Set(compute_total(
            model.subtotal,
            model.shipping_fee,
            model.tax,
            model.discount,
        ));

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn order(status: OrderStatus, shift: DeliveryShift, delivery_date: NaiveDate) -> Model {
        Model {
            id: Uuid::new_v4(),
            order_number: "ORD-1700000000000-AB12".to_string(),
            customer_id: Uuid::new_v4(),
            status,
            payment_status: OrderPaymentStatus::Pending,
            payment_method: PaymentMethod::Cod,
            subtotal: dec!(120),
            shipping_fee: dec!(50),
            tax: dec!(0),
            discount: dec!(0),
            total_amount: dec!(170),
            shipping_address: "{}".to_string(),
            delivery_shift: shift,
            delivery_date,
            customer_notes: None,
            admin_notes: None,
            priority: OrderPriority::Normal,
            delivery_boy_id: None,
            delivery_sequence: None,
            delivered_at: None,
            delivery_notes: None,
            delivery_latitude: None,
            delivery_longitude: None,
            created_at: Utc::now(),
            updated_at: None,
            version: 1,
        }
    }

    fn ist_instant(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        crate::slots::ist()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("valid IST instant")
            .with_timezone(&Utc)
    }

    #[test_case(OrderStatus::Pending, OrderStatus::Confirmed => true)]
    #[test_case(OrderStatus::Pending, OrderStatus::Cancelled => true)]
    #[test_case(OrderStatus::Confirmed, OrderStatus::Delivered => true)]
    #[test_case(OrderStatus::Confirmed, OrderStatus::Cancelled => true)]
    #[test_case(OrderStatus::Pending, OrderStatus::Delivered => false)]
    #[test_case(OrderStatus::Confirmed, OrderStatus::Confirmed => false)]
    #[test_case(OrderStatus::Delivered, OrderStatus::Cancelled => false)]
    #[test_case(OrderStatus::Cancelled, OrderStatus::Confirmed => false)]
    #[test_case(OrderStatus::Cancelled, OrderStatus::Pending => false)]
    fn transition_table(from: OrderStatus, to: OrderStatus) -> bool {
        from.can_transition_to(to)
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            for to in [
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
            ] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn total_is_sum_of_components() {
        assert_eq!(
            compute_total(dec!(120), dec!(50), dec!(6), dec!(10)),
            dec!(166)
        );
    }

    #[test]
    fn morning_cancellation_closes_at_eight_pm_the_evening_before() {
        let delivery = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let o = order(OrderStatus::Confirmed, DeliveryShift::Morning, delivery);

        assert!(o.cancellation_window_open(ist_instant(2026, 8, 7, 19, 59)));
        assert!(!o.cancellation_window_open(ist_instant(2026, 8, 7, 20, 0)));
        assert!(!o.cancellation_window_open(ist_instant(2026, 8, 7, 21, 30)));
    }

    #[test]
    fn evening_cancellation_closes_at_two_pm_on_the_delivery_day() {
        let delivery = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let o = order(OrderStatus::Confirmed, DeliveryShift::Evening, delivery);

        assert!(o.cancellation_window_open(ist_instant(2026, 8, 8, 13, 59)));
        assert!(!o.cancellation_window_open(ist_instant(2026, 8, 8, 14, 0)));
    }

    #[test]
    fn delivery_marking_requires_confirmed_assigned_and_window() {
        let delivery = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let in_window = ist_instant(2026, 8, 8, 7, 30);
        let out_of_window = ist_instant(2026, 8, 8, 12, 30);

        let mut o = order(OrderStatus::Confirmed, DeliveryShift::Morning, delivery);
        // Unassigned
        assert!(!o.can_be_marked_as_delivered(in_window));

        o.delivery_boy_id = Some(Uuid::new_v4());
        assert!(o.can_be_marked_as_delivered(in_window));
        assert!(!o.can_be_marked_as_delivered(out_of_window));

        o.status = OrderStatus::Pending;
        assert!(!o.can_be_marked_as_delivered(in_window));
    }

    #[test]
    fn morning_window_boundaries_are_inclusive() {
        let shift = DeliveryShift::Morning;
        assert!(shift.delivery_window_contains(hms(5, 0)));
        assert!(shift.delivery_window_contains(hms(11, 0)));
        assert!(!shift.delivery_window_contains(NaiveTime::from_hms_opt(11, 0, 1).unwrap()));
        assert!(!shift.delivery_window_contains(NaiveTime::from_hms_opt(4, 59, 59).unwrap()));
    }
}
