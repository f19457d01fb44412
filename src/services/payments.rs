use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::order::{self, Entity as OrderEntity, OrderPaymentStatus, OrderStatus},
    entities::payment::{
        self, Entity as PaymentEntity, PaymentSessionStatus, VerificationStatus,
    },
    entities::payment_order::{self, Entity as PaymentOrderEntity},
    entities::Actor,
    errors::ServiceError,
    events::{Event, EventSender},
};

/// UPI payee and session knobs from configuration.
#[derive(Debug, Clone)]
pub struct UpiPolicy {
    pub payee_id: String,
    pub payee_name: String,
    pub session_ttl_minutes: i64,
    pub qr_image_endpoint: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub order_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteSessionRequest {
    pub upi_transaction_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentSessionResponse {
    pub id: Uuid,
    pub reference: String,
    pub customer_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentSessionStatus,
    pub verification_status: VerificationStatus,
    pub upi_uri: String,
    pub qr_code_url: String,
    pub upi_transaction_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub order_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Manages UPI payment sessions over confirmed/delivered orders.
///
/// Expiry is enforced lazily: the wall clock is compared on the next state
/// change, there is no active timer.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    policy: UpiPolicy,
}

impl PaymentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, policy: UpiPolicy) -> Self {
        Self {
            db,
            event_sender,
            policy,
        }
    }

    /// Opens a payment session covering the given orders.
    ///
    /// Every order must belong to the caller, be confirmed or delivered,
    /// and not already be paid or sitting in another session awaiting
    /// verification.
    #[instrument(skip(self, request), fields(customer_id = %customer_id))]
    pub async fn create_session(
        &self,
        customer_id: Uuid,
        request: CreateSessionRequest,
        now: DateTime<Utc>,
    ) -> Result<PaymentSessionResponse, ServiceError> {
        let order_ids: Vec<Uuid> = request
            .order_ids
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if order_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "A payment session needs at least one order".to_string(),
            ));
        }

        let orders = OrderEntity::find()
            .filter(order::Column::Id.is_in(order_ids.clone()))
            .all(&*self.db)
            .await?;
        if orders.len() != order_ids.len() {
            return Err(ServiceError::NotFound(
                "One or more orders could not be found".to_string(),
            ));
        }

        let mut amount = Decimal::ZERO;
        for order in &orders {
            if order.customer_id != customer_id {
                return Err(ServiceError::Forbidden(format!(
                    "Order {} belongs to another customer",
                    order.order_number
                )));
            }
            if !matches!(order.status, OrderStatus::Confirmed | OrderStatus::Delivered) {
                return Err(ServiceError::InvalidOperation(format!(
                    "Order {} is {}; only confirmed or delivered orders can be paid",
                    order.order_number,
                    order.status.as_str()
                )));
            }
            match order.payment_status {
                OrderPaymentStatus::Paid => {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Order {} is already paid",
                        order.order_number
                    )))
                }
                OrderPaymentStatus::Processing => {
                    return Err(ServiceError::Conflict(format!(
                        "Order {} already has a payment awaiting verification",
                        order.order_number
                    )))
                }
                _ => {}
            }
            amount += order.total_amount;
        }

        let payment_id = Uuid::new_v4();
        let reference = generate_reference(now);
        let upi_uri = build_upi_uri(&self.policy, amount, &reference)?;
        let qr_code_url = build_qr_url(&self.policy, &upi_uri)?;
        let expires_at = now + Duration::minutes(self.policy.session_ttl_minutes);

        let txn = self.db.begin().await?;

        let session = payment::ActiveModel {
            id: Set(payment_id),
            reference: Set(reference.clone()),
            customer_id: Set(customer_id),
            amount: Set(amount),
            status: Set(PaymentSessionStatus::Pending),
            verification_status: Set(VerificationStatus::Pending),
            upi_uri: Set(upi_uri),
            qr_code_url: Set(qr_code_url),
            upi_transaction_id: Set(None),
            expires_at: Set(expires_at),
            verified_by: Set(None),
            verified_at: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let inserted = session.insert(&txn).await?;

        for order_id in &order_ids {
            payment_order::ActiveModel {
                id: Set(Uuid::new_v4()),
                payment_id: Set(payment_id),
                order_id: Set(*order_id),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(%payment_id, %reference, orders = order_ids.len(), "payment session created");

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentSessionCreated(payment_id))
            .await
        {
            warn!(error = %e, %payment_id, "failed to send payment session created event");
        }

        Ok(to_response(inserted, order_ids))
    }

    /// The payer reports the UPI transaction id from their banking app.
    /// An expired session flips to cancelled instead.
    #[instrument(skip(self, request), fields(payment_id = %payment_id))]
    pub async fn complete(
        &self,
        customer_id: Uuid,
        payment_id: Uuid,
        request: CompleteSessionRequest,
        now: DateTime<Utc>,
    ) -> Result<PaymentSessionResponse, ServiceError> {
        if request.upi_transaction_id.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "UPI transaction id is required".to_string(),
            ));
        }

        let session = self.owned_session(customer_id, payment_id).await?;

        if session.status != PaymentSessionStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Payment {} is not awaiting completion",
                session.reference
            )));
        }

        if session.is_expired(now) {
            let reference = session.reference.clone();
            let mut expired: payment::ActiveModel = session.into();
            expired.status = Set(PaymentSessionStatus::Cancelled);
            expired.updated_at = Set(Some(now));
            expired.update(&*self.db).await?;

            if let Err(e) = self
                .event_sender
                .send(Event::PaymentSessionExpired(payment_id))
                .await
            {
                warn!(error = %e, %payment_id, "failed to send payment expired event");
            }

            return Err(ServiceError::PaymentSessionExpired(format!(
                "Payment {} expired; start a new session",
                reference
            )));
        }

        let txn = self.db.begin().await?;

        let order_ids = linked_order_ids(&txn, payment_id).await?;

        let mut active: payment::ActiveModel = session.into();
        active.status = Set(PaymentSessionStatus::Completed);
        active.upi_transaction_id = Set(Some(request.upi_transaction_id.trim().to_string()));
        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await?;

        // Orders wait in `processing` until an admin verifies the payment
        OrderEntity::update_many()
            .col_expr(
                order::Column::PaymentStatus,
                Expr::value(OrderPaymentStatus::Processing),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(order::Column::Id.is_in(order_ids.clone()))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(%payment_id, "payment session completed, awaiting verification");

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentSessionCompleted(payment_id))
            .await
        {
            warn!(error = %e, %payment_id, "failed to send payment completed event");
        }

        Ok(to_response(updated, order_ids))
    }

    /// Admin verification: cascade `paid` to every linked order.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn verify(
        &self,
        payment_id: Uuid,
        verified_by: Actor,
        now: DateTime<Utc>,
    ) -> Result<PaymentSessionResponse, ServiceError> {
        self.settle(
            payment_id,
            verified_by,
            now,
            VerificationStatus::Verified,
            OrderPaymentStatus::Paid,
            Event::PaymentVerified(payment_id),
        )
        .await
    }

    /// Admin rejection: orders return to `pending` so the customer can
    /// start a fresh session.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn reject(
        &self,
        payment_id: Uuid,
        verified_by: Actor,
        now: DateTime<Utc>,
    ) -> Result<PaymentSessionResponse, ServiceError> {
        self.settle(
            payment_id,
            verified_by,
            now,
            VerificationStatus::Rejected,
            OrderPaymentStatus::Pending,
            Event::PaymentRejected(payment_id),
        )
        .await
    }

    async fn settle(
        &self,
        payment_id: Uuid,
        verified_by: Actor,
        now: DateTime<Utc>,
        verdict: VerificationStatus,
        cascade: OrderPaymentStatus,
        event: Event,
    ) -> Result<PaymentSessionResponse, ServiceError> {
        let session = PaymentEntity::find_by_id(payment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))?;

        if session.status != PaymentSessionStatus::Completed
            || session.verification_status != VerificationStatus::Pending
        {
            return Err(ServiceError::InvalidOperation(format!(
                "Payment {} is not awaiting verification",
                session.reference
            )));
        }

        let txn = self.db.begin().await?;
        let order_ids = linked_order_ids(&txn, payment_id).await?;

        let mut active: payment::ActiveModel = session.into();
        active.verification_status = Set(verdict);
        if verdict == VerificationStatus::Rejected {
            active.status = Set(PaymentSessionStatus::Failed);
        }
        active.verified_by = Set(Some(verified_by.to_string()));
        active.verified_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await?;

        OrderEntity::update_many()
            .col_expr(order::Column::PaymentStatus, Expr::value(cascade))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(order::Column::Id.is_in(order_ids.clone()))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(%payment_id, verdict = ?verdict, "payment verification settled");

        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, %payment_id, "failed to send payment settlement event");
        }

        Ok(to_response(updated, order_ids))
    }

    /// A customer's view of one of their sessions.
    pub async fn get_session_for_customer(
        &self,
        customer_id: Uuid,
        payment_id: Uuid,
    ) -> Result<PaymentSessionResponse, ServiceError> {
        let session = self.owned_session(customer_id, payment_id).await?;
        let order_ids = linked_order_ids(&*self.db, payment_id).await?;
        Ok(to_response(session, order_ids))
    }

    /// Sessions completed by payers and waiting on an admin decision.
    pub async fn pending_verifications(
        &self,
    ) -> Result<Vec<PaymentSessionResponse>, ServiceError> {
        let sessions = PaymentEntity::find()
            .filter(payment::Column::Status.eq(PaymentSessionStatus::Completed))
            .filter(payment::Column::VerificationStatus.eq(VerificationStatus::Pending))
            .order_by_asc(payment::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut responses = Vec::with_capacity(sessions.len());
        for session in sessions {
            let order_ids = linked_order_ids(&*self.db, session.id).await?;
            responses.push(to_response(session, order_ids));
        }
        Ok(responses)
    }

    async fn owned_session(
        &self,
        customer_id: Uuid,
        payment_id: Uuid,
    ) -> Result<payment::Model, ServiceError> {
        let session = PaymentEntity::find_by_id(payment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))?;
        if session.customer_id != customer_id {
            return Err(ServiceError::Forbidden(
                "This payment belongs to another customer".to_string(),
            ));
        }
        Ok(session)
    }
}

async fn linked_order_ids<C: sea_orm::ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
) -> Result<Vec<Uuid>, ServiceError> {
    Ok(PaymentOrderEntity::find()
        .filter(payment_order::Column::PaymentId.eq(payment_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|link| link.order_id)
        .collect())
}

fn to_response(model: payment::Model, order_ids: Vec<Uuid>) -> PaymentSessionResponse {
    PaymentSessionResponse {
        id: model.id,
        reference: model.reference,
        customer_id: model.customer_id,
        amount: model.amount,
        status: model.status,
        verification_status: model.verification_status,
        upi_uri: model.upi_uri,
        qr_code_url: model.qr_code_url,
        upi_transaction_id: model.upi_transaction_id,
        expires_at: model.expires_at,
        order_ids,
        created_at: model.created_at,
    }
}

fn generate_reference(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("PAY-{}-{}", now.timestamp_millis(), suffix)
}

/// UPI deep link embedding payee, amount and reference.
fn build_upi_uri(
    policy: &UpiPolicy,
    amount: Decimal,
    reference: &str,
) -> Result<String, ServiceError> {
    let uri = Url::parse_with_params(
        "upi://pay",
        &[
            ("pa", policy.payee_id.as_str()),
            ("pn", policy.payee_name.as_str()),
            ("am", &amount.round_dp(2).to_string()),
            ("tr", reference),
            ("cu", "INR"),
        ],
    )
    .map_err(|e| ServiceError::InternalError(format!("failed to build UPI URI: {}", e)))?;
    Ok(uri.to_string())
}

/// QR rendering is delegated to an external image endpoint; the deep link
/// travels as the QR payload.
fn build_qr_url(policy: &UpiPolicy, upi_uri: &str) -> Result<String, ServiceError> {
    let url = Url::parse_with_params(
        &policy.qr_image_endpoint,
        &[("size", "300x300"), ("data", upi_uri)],
    )
    .map_err(|e| ServiceError::InternalError(format!("failed to build QR URL: {}", e)))?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn policy() -> UpiPolicy {
        UpiPolicy {
            payee_id: "milkrun@upi".to_string(),
            payee_name: "Milkrun Dairy".to_string(),
            session_ttl_minutes: 30,
            qr_image_endpoint: "https://api.qrserver.com/v1/create-qr-code/".to_string(),
        }
    }

    #[test]
    fn upi_uri_embeds_payee_amount_and_reference() {
        let uri = build_upi_uri(&policy(), dec!(499.5), "PAY-1-XYZ0").unwrap();
        assert!(uri.starts_with("upi://pay?"));
        assert!(uri.contains("pa=milkrun%40upi"));
        assert!(uri.contains("am=499.50") || uri.contains("am=499.5"));
        assert!(uri.contains("tr=PAY-1-XYZ0"));
        assert!(uri.contains("cu=INR"));
    }

    #[test]
    fn qr_url_wraps_the_deep_link() {
        let uri = build_upi_uri(&policy(), dec!(100), "PAY-1-ABCD").unwrap();
        let qr = build_qr_url(&policy(), &uri).unwrap();
        assert!(qr.starts_with("https://api.qrserver.com/v1/create-qr-code/?"));
        assert!(qr.contains("size=300x300"));
        assert!(qr.contains("data=upi%3A%2F%2Fpay"));
    }

    #[test]
    fn references_are_prefixed_and_suffixed() {
        let reference = generate_reference(Utc::now());
        assert!(reference.starts_with("PAY-"));
        assert_eq!(reference.split('-').count(), 3);
    }

    #[test]
    fn expiry_is_a_wall_clock_comparison() {
        let now = Utc::now();
        let session = payment::Model {
            id: Uuid::new_v4(),
            reference: "PAY-1-AAAA".to_string(),
            customer_id: Uuid::new_v4(),
            amount: dec!(100),
            status: PaymentSessionStatus::Pending,
            verification_status: VerificationStatus::Pending,
            upi_uri: String::new(),
            qr_code_url: String::new(),
            upi_transaction_id: None,
            expires_at: now + Duration::minutes(30),
            verified_by: None,
            verified_at: None,
            created_at: now,
            updated_at: None,
        };
        assert!(!session.is_expired(now + Duration::minutes(29)));
        assert!(session.is_expired(now + Duration::minutes(30)));
    }
}
