use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Handle used by services to publish domain events.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Domain events emitted by the services. Consumers are best-effort; a
/// dropped event never fails the operation that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order lifecycle
    OrderCreated(Uuid),
    OrderConfirmed(Uuid),
    OrderDelivered {
        order_id: Uuid,
        delivery_boy_id: Uuid,
    },
    OrderCancelled {
        order_id: Uuid,
        cancelled_from: String,
    },

    // Stock ledger
    StockCommitted {
        product_id: Uuid,
        quantity: i32,
    },
    StockRestored {
        product_id: Uuid,
        quantity: i32,
    },
    StockAdjusted {
        product_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },

    // Delivery assignment
    AssignmentCreated {
        customer_id: Uuid,
        delivery_boy_id: Uuid,
    },
    AssignmentRemoved {
        customer_id: Uuid,
    },
    AssignmentsTransferred {
        from_delivery_boy_id: Uuid,
        to_delivery_boy_id: Uuid,
        customers_moved: u64,
    },

    // Payment sessions
    PaymentSessionCreated(Uuid),
    PaymentSessionCompleted(Uuid),
    PaymentSessionExpired(Uuid),
    PaymentVerified(Uuid),
    PaymentRejected(Uuid),

    // Accounts
    CustomerRegistered(Uuid),

    Generic {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Background consumer for the event channel. Runs for the lifetime of the
/// process; events are logged for audit and handed to best-effort side
/// effects (outbound email).
pub async fn process_events(
    mut receiver: mpsc::Receiver<Event>,
    mailer: Option<crate::services::notifications::EmailService>,
) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        debug!(?event, "processing event");
        match &event {
            Event::OrderCreated(order_id) => {
                info!(%order_id, "order created");
                if let Some(mailer) = &mailer {
                    mailer.send_order_created(*order_id).await;
                }
            }
            Event::OrderConfirmed(order_id) => info!(%order_id, "order confirmed"),
            Event::OrderDelivered {
                order_id,
                delivery_boy_id,
            } => info!(%order_id, %delivery_boy_id, "order delivered"),
            Event::OrderCancelled {
                order_id,
                cancelled_from,
            } => info!(%order_id, %cancelled_from, "order cancelled"),
            Event::PaymentVerified(payment_id) => {
                info!(%payment_id, "payment verified");
                if let Some(mailer) = &mailer {
                    mailer.send_payment_verified(*payment_id).await;
                }
            }
            other => debug!(?other, "event recorded"),
        }
    }
    info!("Event processor stopped: channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let order_id = Uuid::new_v4();

        sender.send(Event::OrderCreated(order_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::OrderCreated(Uuid::new_v4())).await.is_err());
    }
}
