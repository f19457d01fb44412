//! Tests for the delivery-assignment manager: assignment propagation to
//! open orders, reassignment modes, removal, bulk transfer and the
//! one-active-assignment invariant.

mod common;

use assert_matches::assert_matches;
use common::{date, ist_instant, TestContext};
use milkrun_api::entities::order::{DeliveryShift, OrderStatus, PaymentMethod};
use milkrun_api::entities::Actor;
use milkrun_api::errors::ServiceError;
use milkrun_api::services::assignments::{
    AssignRequest, BulkTransferRequest, ReassignMode, ReassignRequest,
};
use milkrun_api::services::orders::{CreateOrderItem, CreateOrderRequest, ShippingAddress};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn order_request(product_id: Uuid) -> CreateOrderRequest {
    CreateOrderRequest {
        items: vec![CreateOrderItem {
            product_id,
            quantity: 1,
        }],
        shipping_address: ShippingAddress {
            name: "Asha Rao".to_string(),
            street: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            postal_code: "411001".to_string(),
            phone: "9876543210".to_string(),
        },
        payment_method: PaymentMethod::Cod,
        delivery_shift: DeliveryShift::Morning,
        delivery_date: date(2026, 8, 8),
        customer_notes: None,
        priority: None,
    }
}

fn assign_request(customer_id: Uuid, delivery_boy_id: Uuid) -> AssignRequest {
    AssignRequest {
        customer_id,
        delivery_boy_id,
        shifts: Some("morning".to_string()),
        areas: None,
        notes: None,
        sequence: None,
    }
}

#[tokio::test]
async fn assignment_stamps_existing_open_orders_and_new_ones() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let boy = ctx.seed_delivery_boy("Ravi", "ravi@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 20).await;

    // Order placed before any assignment exists is unassigned
    let now = ist_instant(2026, 8, 7, 9, 0);
    let early_order = ctx
        .services
        .orders
        .create_order(customer.id, order_request(milk.id), now)
        .await
        .expect("order created");
    assert_eq!(early_order.delivery_boy_id, None);

    ctx.services
        .assignments
        .assign(assign_request(customer.id, boy.id), Actor::SystemAdmin, now)
        .await
        .expect("assigned");

    // Existing open order got stamped retroactively
    let refreshed = ctx
        .services
        .orders
        .get_order(early_order.id)
        .await
        .expect("order");
    assert_eq!(refreshed.delivery_boy_id, Some(boy.id));

    // New orders are auto-assigned at creation
    let later_order = ctx
        .services
        .orders
        .create_order(customer.id, order_request(milk.id), now)
        .await
        .expect("order created");
    assert_eq!(later_order.delivery_boy_id, Some(boy.id));
}

#[tokio::test]
async fn at_most_one_active_assignment_per_customer() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let ravi = ctx.seed_delivery_boy("Ravi", "ravi@example.com").await;
    let sunil = ctx.seed_delivery_boy("Sunil", "sunil@example.com").await;

    let now = ist_instant(2026, 8, 7, 9, 0);
    ctx.services
        .assignments
        .assign(assign_request(customer.id, ravi.id), Actor::SystemAdmin, now)
        .await
        .expect("first assignment");
    ctx.services
        .assignments
        .assign(
            assign_request(customer.id, sunil.id),
            Actor::SystemAdmin,
            ist_instant(2026, 8, 7, 10, 0),
        )
        .await
        .expect("second assignment supersedes the first");

    let active = ctx
        .services
        .assignments
        .active_assignment_for(customer.id)
        .await
        .expect("query")
        .expect("one active");
    assert_eq!(active.delivery_boy_id, sunil.id);

    // History keeps the deactivated record
    let history = ctx
        .services
        .assignments
        .history_for_customer(customer.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|a| a.is_active).count(), 1);
    assert!(history
        .iter()
        .any(|a| !a.is_active && a.deactivated_at.is_some()));
}

#[tokio::test]
async fn entire_reassignment_cascades_to_open_orders() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Usha", "usha@example.com").await;
    let a = ctx.seed_delivery_boy("A", "a@example.com").await;
    let b = ctx.seed_delivery_boy("B", "b@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 20).await;

    let now = ist_instant(2026, 8, 7, 9, 0);
    ctx.services
        .assignments
        .assign(assign_request(customer.id, a.id), Actor::SystemAdmin, now)
        .await
        .expect("assigned to A");

    // O1 stays pending, O2 is confirmed: both are open
    let o1 = ctx
        .services
        .orders
        .create_order(customer.id, order_request(milk.id), now)
        .await
        .expect("o1");
    let o2 = ctx
        .services
        .orders
        .create_order(customer.id, order_request(milk.id), now)
        .await
        .expect("o2");
    ctx.services
        .orders
        .update_status(o2.id, OrderStatus::Confirmed, None, now)
        .await
        .expect("o2 confirmed");

    ctx.services
        .assignments
        .reassign(
            ReassignRequest {
                customer_id: customer.id,
                to_delivery_boy_id: b.id,
                mode: ReassignMode::Entire,
                from: None,
                to: None,
                notes: None,
            },
            Actor::SystemAdmin,
            ist_instant(2026, 8, 7, 12, 0),
        )
        .await
        .expect("reassigned");

    for order_id in [o1.id, o2.id] {
        let order = ctx.services.orders.get_order(order_id).await.expect("order");
        assert_eq!(order.delivery_boy_id, Some(b.id));
    }
    let active = ctx
        .services
        .assignments
        .active_assignment_for(customer.id)
        .await
        .expect("query")
        .expect("active");
    assert_eq!(active.delivery_boy_id, b.id);
}

#[tokio::test]
async fn date_range_reassignment_moves_only_the_window() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Usha", "usha@example.com").await;
    let a = ctx.seed_delivery_boy("A", "a@example.com").await;
    let b = ctx.seed_delivery_boy("B", "b@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 20).await;

    let monday = ist_instant(2026, 8, 3, 9, 0);
    let friday = ist_instant(2026, 8, 7, 9, 0);

    ctx.services
        .assignments
        .assign(assign_request(customer.id, a.id), Actor::SystemAdmin, monday)
        .await
        .expect("assigned to A");

    let mut old_req = order_request(milk.id);
    old_req.delivery_date = date(2026, 8, 4);
    let old_order = ctx
        .services
        .orders
        .create_order(customer.id, old_req, monday)
        .await
        .expect("old order");
    let new_order = ctx
        .services
        .orders
        .create_order(customer.id, order_request(milk.id), friday)
        .await
        .expect("new order");

    // Move only orders created on Friday
    ctx.services
        .assignments
        .reassign(
            ReassignRequest {
                customer_id: customer.id,
                to_delivery_boy_id: b.id,
                mode: ReassignMode::DateRange,
                from: Some(ist_instant(2026, 8, 7, 0, 0)),
                to: Some(ist_instant(2026, 8, 7, 23, 59)),
                notes: Some("covering leave".to_string()),
            },
            Actor::SystemAdmin,
            ist_instant(2026, 8, 7, 12, 0),
        )
        .await
        .expect("date-range reassigned");

    let old_fetched = ctx
        .services
        .orders
        .get_order(old_order.id)
        .await
        .expect("old");
    let new_fetched = ctx
        .services
        .orders
        .get_order(new_order.id)
        .await
        .expect("new");
    assert_eq!(old_fetched.delivery_boy_id, Some(a.id));
    assert_eq!(new_fetched.delivery_boy_id, Some(b.id));

    // Standing assignment is untouched; the range move is history only
    let active = ctx
        .services
        .assignments
        .active_assignment_for(customer.id)
        .await
        .expect("query")
        .expect("active");
    assert_eq!(active.delivery_boy_id, a.id);
    let history = ctx
        .services
        .assignments
        .history_for_customer(customer.id)
        .await
        .expect("history");
    assert!(history
        .iter()
        .any(|record| !record.is_active && record.delivery_boy_id == b.id));
}

#[tokio::test]
async fn removal_returns_orders_to_the_unassigned_pool() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Usha", "usha@example.com").await;
    let a = ctx.seed_delivery_boy("A", "a@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 20).await;

    let now = ist_instant(2026, 8, 7, 9, 0);
    ctx.services
        .assignments
        .assign(assign_request(customer.id, a.id), Actor::SystemAdmin, now)
        .await
        .expect("assigned");
    let order = ctx
        .services
        .orders
        .create_order(customer.id, order_request(milk.id), now)
        .await
        .expect("order");
    assert_eq!(order.delivery_boy_id, Some(a.id));

    ctx.services
        .assignments
        .remove(customer.id, ist_instant(2026, 8, 7, 10, 0))
        .await
        .expect("removed");

    let refreshed = ctx.services.orders.get_order(order.id).await.expect("order");
    assert_eq!(refreshed.delivery_boy_id, None);
    assert!(ctx
        .services
        .assignments
        .active_assignment_for(customer.id)
        .await
        .expect("query")
        .is_none());

    // Removing again reports not-found
    let err = ctx
        .services
        .assignments
        .remove(customer.id, ist_instant(2026, 8, 7, 11, 0))
        .await
        .expect_err("nothing to remove");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn bulk_transfer_moves_every_customer_and_their_orders() {
    let ctx = TestContext::new().await;
    let from = ctx.seed_delivery_boy("From", "from@example.com").await;
    let to = ctx.seed_delivery_boy("To", "to@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 50).await;

    let now = ist_instant(2026, 8, 7, 9, 0);
    let mut order_ids = Vec::new();
    for i in 0..3 {
        let customer = ctx
            .seed_customer(&format!("C{i}"), &format!("c{i}@example.com"))
            .await;
        ctx.services
            .assignments
            .assign(assign_request(customer.id, from.id), Actor::SystemAdmin, now)
            .await
            .expect("assigned");
        let order = ctx
            .services
            .orders
            .create_order(customer.id, order_request(milk.id), now)
            .await
            .expect("order");
        order_ids.push(order.id);
    }

    let moved = ctx
        .services
        .assignments
        .bulk_transfer(
            BulkTransferRequest {
                from_delivery_boy_id: from.id,
                to_delivery_boy_id: to.id,
                notes: Some("on leave".to_string()),
            },
            Actor::SystemAdmin,
            ist_instant(2026, 8, 7, 10, 0),
        )
        .await
        .expect("transferred");
    assert_eq!(moved, 3);

    for order_id in order_ids {
        let order = ctx.services.orders.get_order(order_id).await.expect("order");
        assert_eq!(order.delivery_boy_id, Some(to.id));
    }
    assert!(ctx
        .services
        .assignments
        .active_assignments_for_delivery_boy(from.id)
        .await
        .expect("query")
        .is_empty());
    assert_eq!(
        ctx.services
            .assignments
            .active_assignments_for_delivery_boy(to.id)
            .await
            .expect("query")
            .len(),
        3
    );
}

#[tokio::test]
async fn assigning_to_an_inactive_delivery_person_is_refused() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Usha", "usha@example.com").await;
    let boy = ctx.seed_delivery_boy("Ravi", "ravi@example.com").await;

    // Deactivate directly
    use milkrun_api::entities::delivery_boy;
    use sea_orm::{ActiveModelTrait, Set};
    let mut active: delivery_boy::ActiveModel = boy.clone().into();
    active.is_active = Set(false);
    active.update(&*ctx.db).await.expect("deactivated");

    let err = ctx
        .services
        .assignments
        .assign(
            assign_request(customer.id, boy.id),
            Actor::SystemAdmin,
            ist_instant(2026, 8, 7, 9, 0),
        )
        .await
        .expect_err("inactive refusal");
    assert_matches!(err, ServiceError::InvalidOperation(_));
}
