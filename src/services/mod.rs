pub mod assignments;
pub mod catalog;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod reports;
pub mod stock;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::events::EventSender;

/// Aggregate of the application services handed to the HTTP layer.
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub orders: Arc<orders::OrderService>,
    pub stock: Arc<stock::StockService>,
    pub catalog: Arc<catalog::CatalogService>,
    pub assignments: Arc<assignments::AssignmentService>,
    pub payments: Arc<payments::PaymentService>,
    pub reports: Arc<reports::ReportingService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        auth: Arc<AuthService>,
        config: &AppConfig,
    ) -> Self {
        let stock = Arc::new(stock::StockService::new(db.clone(), event_sender.clone()));
        let assignments = Arc::new(assignments::AssignmentService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let orders = Arc::new(orders::OrderService::new(
            db.clone(),
            event_sender.clone(),
            stock.clone(),
            assignments.clone(),
            orders::PricingPolicy {
                shipping_fee: config.shipping_fee(),
                tax_rate: config.tax_rate_decimal(),
            },
        ));
        let payments = Arc::new(payments::PaymentService::new(
            db.clone(),
            event_sender,
            payments::UpiPolicy {
                payee_id: config.upi_payee_id.clone(),
                payee_name: config.upi_payee_name.clone(),
                session_ttl_minutes: config.payment_session_ttl_minutes,
                qr_image_endpoint: config.qr_image_endpoint.clone(),
            },
        ));
        let catalog = Arc::new(catalog::CatalogService::new(db.clone()));
        let reports = Arc::new(reports::ReportingService::new(db));

        Self {
            auth,
            orders,
            stock,
            catalog,
            assignments,
            payments,
            reports,
        }
    }
}
