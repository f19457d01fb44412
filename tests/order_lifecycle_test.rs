//! End-to-end tests for the order lifecycle: placement against the slot
//! calendar, confirmation with stock commit, cancellation with stock
//! restore, and delivery marking inside the shift window.

mod common;

use assert_matches::assert_matches;
use common::{date, ist_instant, TestContext};
use milkrun_api::entities::order::{
    DeliveryShift, OrderPaymentStatus, OrderStatus, PaymentMethod,
};
use milkrun_api::errors::ServiceError;
use milkrun_api::services::assignments::AssignRequest;
use milkrun_api::services::orders::{
    CreateOrderItem, CreateOrderRequest, MarkDeliveredRequest, ShippingAddress,
};
use milkrun_api::entities::Actor;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Asha Rao".to_string(),
        street: "12 MG Road".to_string(),
        city: "Pune".to_string(),
        postal_code: "411001".to_string(),
        phone: "9876543210".to_string(),
    }
}

fn order_request(items: Vec<CreateOrderItem>) -> CreateOrderRequest {
    CreateOrderRequest {
        items,
        shipping_address: address(),
        payment_method: PaymentMethod::Upi,
        delivery_shift: DeliveryShift::Morning,
        delivery_date: date(2026, 8, 8),
        customer_notes: None,
        priority: None,
    }
}

#[tokio::test]
async fn creation_computes_totals_and_leaves_stock_untouched() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 5).await;

    let now = ist_instant(2026, 8, 7, 10, 0);
    let order = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![CreateOrderItem {
                product_id: milk.id,
                quantity: 2,
            }]),
            now,
        )
        .await
        .expect("order created");

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
    assert_eq!(order.subtotal, dec!(120));
    assert_eq!(order.shipping_fee, dec!(50));
    assert_eq!(order.total_amount, dec!(170));
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].unit_price, dec!(60));

    // Stock is only reserved logically by the check, not committed
    assert_eq!(ctx.product_stock(milk.id).await, 5);
}

#[tokio::test]
async fn line_item_price_is_a_frozen_snapshot() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Toned Milk 1L", dec!(48), 10).await;

    let now = ist_instant(2026, 8, 7, 9, 0);
    let order = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![CreateOrderItem {
                product_id: milk.id,
                quantity: 1,
            }]),
            now,
        )
        .await
        .expect("order created");

    // Reprice the product after the order exists
    ctx.services
        .catalog
        .update(
            milk.id,
            milkrun_api::services::catalog::UpdateProductRequest {
                name: None,
                description: None,
                unit: None,
                price: Some(dec!(55)),
                discount_price: None,
                image_url: None,
                category: None,
                status: None,
            },
        )
        .await
        .expect("repriced");

    let fetched = ctx
        .services
        .orders
        .get_order(order.id)
        .await
        .expect("order fetch");
    assert_eq!(fetched.items[0].unit_price, dec!(48));
    assert_eq!(fetched.subtotal, dec!(48));
}

#[tokio::test]
async fn same_day_slot_is_rejected() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 5).await;

    let now = ist_instant(2026, 8, 8, 6, 0);
    let err = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![CreateOrderItem {
                product_id: milk.id,
                quantity: 1,
            }]),
            now,
        )
        .await
        .expect_err("same-day must be rejected");

    assert_matches!(err, ServiceError::SlotUnavailable(_));
}

#[tokio::test]
async fn evening_shift_is_rejected_unconditionally() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 5).await;

    let mut request = order_request(vec![CreateOrderItem {
        product_id: milk.id,
        quantity: 1,
    }]);
    request.delivery_shift = DeliveryShift::Evening;

    let err = ctx
        .services
        .orders
        .create_order(customer.id, request, ist_instant(2026, 8, 7, 10, 0))
        .await
        .expect_err("evening must be rejected");
    assert_matches!(err, ServiceError::SlotUnavailable(_));
}

#[tokio::test]
async fn confirmation_decrements_stock_exactly_once() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 5).await;

    let now = ist_instant(2026, 8, 7, 10, 0);
    let order = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![CreateOrderItem {
                product_id: milk.id,
                quantity: 2,
            }]),
            now,
        )
        .await
        .expect("order created");

    let confirmed = ctx
        .services
        .orders
        .update_status(order.id, OrderStatus::Confirmed, None, now)
        .await
        .expect("confirmed");
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert_eq!(ctx.product_stock(milk.id).await, 3);

    // Repeating the confirmation is refused by the transition table and
    // must not decrement again
    let err = ctx
        .services
        .orders
        .update_status(order.id, OrderStatus::Confirmed, None, now)
        .await
        .expect_err("double confirm refused");
    assert_matches!(err, ServiceError::InvalidTransition(_));
    assert_eq!(ctx.product_stock(milk.id).await, 3);
}

#[tokio::test]
async fn cancelling_a_confirmed_order_restores_stock() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 5).await;

    let now = ist_instant(2026, 8, 7, 10, 0);
    let order = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![CreateOrderItem {
                product_id: milk.id,
                quantity: 2,
            }]),
            now,
        )
        .await
        .expect("order created");
    ctx.services
        .orders
        .update_status(order.id, OrderStatus::Confirmed, None, now)
        .await
        .expect("confirmed");
    assert_eq!(ctx.product_stock(milk.id).await, 3);

    // User cancels before the 20:00 cutoff of the evening before delivery
    let cancelled = ctx
        .services
        .orders
        .cancel_order(customer.id, order.id, None, ist_instant(2026, 8, 7, 18, 0))
        .await
        .expect("cancelled");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(ctx.product_stock(milk.id).await, 5);
}

#[tokio::test]
async fn cancelling_a_pending_order_leaves_stock_untouched() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 5).await;

    let now = ist_instant(2026, 8, 7, 10, 0);
    let order = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![CreateOrderItem {
                product_id: milk.id,
                quantity: 2,
            }]),
            now,
        )
        .await
        .expect("order created");

    ctx.services
        .orders
        .cancel_order(customer.id, order.id, None, ist_instant(2026, 8, 7, 11, 0))
        .await
        .expect("cancelled");
    assert_eq!(ctx.product_stock(milk.id).await, 5);
}

#[tokio::test]
async fn cancellation_after_the_shift_cutoff_is_refused() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 5).await;

    let now = ist_instant(2026, 8, 7, 10, 0);
    let order = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![CreateOrderItem {
                product_id: milk.id,
                quantity: 1,
            }]),
            now,
        )
        .await
        .expect("order created");

    // 21:00 the evening before a morning delivery is past the 20:00 cutoff
    let err = ctx
        .services
        .orders
        .cancel_order(customer.id, order.id, None, ist_instant(2026, 8, 7, 21, 0))
        .await
        .expect_err("cutoff passed");
    assert_matches!(err, ServiceError::CancellationWindowClosed(_));
}

#[tokio::test]
async fn confirmation_shortfall_rejects_the_whole_order() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 10).await;
    let paneer = ctx.seed_product("Paneer 250g", dec!(90), 5).await;

    let now = ist_instant(2026, 8, 7, 10, 0);
    let order = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![
                CreateOrderItem {
                    product_id: milk.id,
                    quantity: 2,
                },
                CreateOrderItem {
                    product_id: paneer.id,
                    quantity: 3,
                },
            ]),
            now,
        )
        .await
        .expect("order created");

    // Stock drifts between placement and confirmation
    ctx.services
        .stock
        .adjust_stock(paneer.id, 1)
        .await
        .expect("stock adjusted");

    let err = ctx
        .services
        .orders
        .update_status(order.id, OrderStatus::Confirmed, None, now)
        .await
        .expect_err("shortfall must reject the confirmation");

    match err {
        ServiceError::InsufficientStock(msg) => {
            assert!(msg.contains("Paneer 250g"), "message names the product: {msg}");
            assert!(msg.contains("1 available"), "message names the quantity: {msg}");
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // All-or-nothing: no partial decrement survived the rollback
    assert_eq!(ctx.product_stock(milk.id).await, 10);
    assert_eq!(ctx.product_stock(paneer.id).await, 1);

    let unchanged = ctx
        .services
        .orders
        .get_order(order.id)
        .await
        .expect("order still there");
    assert_eq!(unchanged.status, OrderStatus::Pending);
}

#[tokio::test]
async fn confirming_the_last_units_flips_the_product_out_of_stock() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 2).await;

    let now = ist_instant(2026, 8, 7, 10, 0);
    let order = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![CreateOrderItem {
                product_id: milk.id,
                quantity: 2,
            }]),
            now,
        )
        .await
        .expect("order created");
    ctx.services
        .orders
        .update_status(order.id, OrderStatus::Confirmed, None, now)
        .await
        .expect("confirmed");

    let product = ctx.services.catalog.get(milk.id).await.unwrap();
    assert_eq!(product.stock_quantity, 0);
    assert_eq!(
        product.status,
        milkrun_api::entities::product::ProductStatus::OutOfStock
    );

    // Cancelling brings it back
    ctx.services
        .orders
        .update_status(order.id, OrderStatus::Cancelled, None, now)
        .await
        .expect("cancelled");
    let product = ctx.services.catalog.get(milk.id).await.unwrap();
    assert_eq!(product.stock_quantity, 2);
    assert_eq!(
        product.status,
        milkrun_api::entities::product::ProductStatus::Active
    );
}

#[tokio::test]
async fn delivery_marking_respects_assignment_and_window() {
    let ctx = TestContext::new().await;
    let customer = ctx.seed_customer("Asha", "asha@example.com").await;
    let boy = ctx.seed_delivery_boy("Ravi", "ravi@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 5).await;

    ctx.services
        .assignments
        .assign(
            AssignRequest {
                customer_id: customer.id,
                delivery_boy_id: boy.id,
                shifts: Some("morning".to_string()),
                areas: None,
                notes: None,
                sequence: None,
            },
            Actor::SystemAdmin,
            ist_instant(2026, 8, 6, 9, 0),
        )
        .await
        .expect("assigned");

    let now = ist_instant(2026, 8, 7, 10, 0);
    let order = ctx
        .services
        .orders
        .create_order(
            customer.id,
            order_request(vec![CreateOrderItem {
                product_id: milk.id,
                quantity: 1,
            }]),
            now,
        )
        .await
        .expect("order created");
    assert_eq!(order.delivery_boy_id, Some(boy.id));

    ctx.services
        .orders
        .update_status(order.id, OrderStatus::Confirmed, None, now)
        .await
        .expect("confirmed");

    // Outside the 05:00-11:00 morning window
    let err = ctx
        .services
        .orders
        .mark_delivered(
            boy.id,
            order.id,
            MarkDeliveredRequest {
                delivery_notes: None,
                latitude: None,
                longitude: None,
            },
            ist_instant(2026, 8, 8, 12, 30),
        )
        .await
        .expect_err("outside window");
    assert_matches!(err, ServiceError::DeliveryWindowClosed(_));

    // Another delivery person cannot deliver it
    let stranger = Uuid::new_v4();
    let err = ctx
        .services
        .orders
        .mark_delivered(
            stranger,
            order.id,
            MarkDeliveredRequest {
                delivery_notes: None,
                latitude: None,
                longitude: None,
            },
            ist_instant(2026, 8, 8, 7, 0),
        )
        .await
        .expect_err("not the assignee");
    assert_matches!(err, ServiceError::Forbidden(_));

    // Inside the window by the assignee
    let delivered = ctx
        .services
        .orders
        .mark_delivered(
            boy.id,
            order.id,
            MarkDeliveredRequest {
                delivery_notes: Some("left at the door".to_string()),
                latitude: Some(18.5204),
                longitude: Some(73.8567),
            },
            ist_instant(2026, 8, 8, 7, 0),
        )
        .await
        .expect("delivered");
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.delivered_at.is_some());

    // Delivery counter incremented
    let queue_boy = ctx
        .services
        .reports
        .dashboard_summary(ist_instant(2026, 8, 8, 8, 0))
        .await
        .expect("summary");
    let stats = queue_boy
        .delivery_boys
        .iter()
        .find(|b| b.id == boy.id)
        .expect("boy in summary");
    assert_eq!(stats.total_deliveries, 1);

    // Terminal: nothing moves a delivered order
    let err = ctx
        .services
        .orders
        .update_status(order.id, OrderStatus::Cancelled, None, now)
        .await
        .expect_err("terminal state");
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn work_queue_orders_by_sequence_then_age() {
    let ctx = TestContext::new().await;
    let boy = ctx.seed_delivery_boy("Ravi", "ravi@example.com").await;
    let first = ctx.seed_customer("First", "first@example.com").await;
    let second = ctx.seed_customer("Second", "second@example.com").await;
    let milk = ctx.seed_product("Full Cream Milk 1L", dec!(60), 50).await;

    for (customer, sequence) in [(&first, 2), (&second, 1)] {
        ctx.services
            .assignments
            .assign(
                AssignRequest {
                    customer_id: customer.id,
                    delivery_boy_id: boy.id,
                    shifts: None,
                    areas: None,
                    notes: None,
                    sequence: Some(sequence),
                },
                Actor::SystemAdmin,
                ist_instant(2026, 8, 6, 9, 0),
            )
            .await
            .expect("assigned");
    }

    let now = ist_instant(2026, 8, 7, 10, 0);
    for customer in [&first, &second] {
        let order = ctx
            .services
            .orders
            .create_order(
                customer.id,
                order_request(vec![CreateOrderItem {
                    product_id: milk.id,
                    quantity: 1,
                }]),
                now,
            )
            .await
            .expect("order created");
        ctx.services
            .orders
            .update_status(order.id, OrderStatus::Confirmed, None, now)
            .await
            .expect("confirmed");
    }

    let queue = ctx
        .services
        .orders
        .work_queue(boy.id, date(2026, 8, 8))
        .await
        .expect("queue");

    assert_eq!(queue.len(), 2);
    // Sequence 1 (second customer) leads the round
    assert_eq!(queue[0].customer_id, second.id);
    assert_eq!(queue[1].customer_id, first.id);
}
