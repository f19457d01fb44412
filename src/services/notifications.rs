use std::sync::Arc;

use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::{customer, order, payment};

/// Outbound transactional email over an HTTP API.
///
/// Strictly best-effort: a failed send is logged and swallowed, it never
/// fails the operation that triggered it. When no endpoint is configured
/// every send is a no-op.
#[derive(Clone)]
pub struct EmailService {
    db: Arc<DatabaseConnection>,
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
    from: String,
}

impl EmailService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        api_url: Option<String>,
        api_key: Option<String>,
        from: String,
    ) -> Self {
        Self {
            db,
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }

    pub async fn send_order_created(&self, order_id: Uuid) {
        let Some((email, order_number)) = self.order_recipient(order_id).await else {
            return;
        };
        self.deliver(
            &email,
            &format!("Order {} received", order_number),
            &format!(
                "We have received your order {}. You will get a confirmation shortly.",
                order_number
            ),
        )
        .await;
    }

    pub async fn send_payment_verified(&self, payment_id: Uuid) {
        let session = match payment::Entity::find_by_id(payment_id).one(&*self.db).await {
            Ok(Some(session)) => session,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, %payment_id, "could not load payment for email");
                return;
            }
        };
        let Some(email) = self.customer_email(session.customer_id).await else {
            return;
        };
        self.deliver(
            &email,
            &format!("Payment {} verified", session.reference),
            &format!(
                "Your payment {} of {} has been verified. Thank you!",
                session.reference, session.amount
            ),
        )
        .await;
    }

    async fn order_recipient(&self, order_id: Uuid) -> Option<(String, String)> {
        let order = match order::Entity::find_by_id(order_id).one(&*self.db).await {
            Ok(Some(order)) => order,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, %order_id, "could not load order for email");
                return None;
            }
        };
        let email = self.customer_email(order.customer_id).await?;
        Some((email, order.order_number))
    }

    async fn customer_email(&self, customer_id: Uuid) -> Option<String> {
        match customer::Entity::find_by_id(customer_id).one(&*self.db).await {
            Ok(Some(account)) => Some(account.email),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, %customer_id, "could not load customer for email");
                None
            }
        }
    }

    async fn deliver(&self, to: &str, subject: &str, body: &str) {
        let Some(api_url) = &self.api_url else {
            debug!(to, subject, "email endpoint not configured; skipping send");
            return;
        };

        let mut request = self.client.post(api_url).json(&json!({
            "from": self.from,
            "to": to,
            "subject": subject,
            "text": body,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(to, subject, "email sent");
            }
            Ok(response) => {
                warn!(to, subject, status = %response.status(), "email API rejected send");
            }
            Err(e) => {
                warn!(to, subject, error = %e, "email send failed");
            }
        }
    }
}
