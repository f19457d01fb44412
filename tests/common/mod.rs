//! Shared fixture for service-level integration tests.
//!
//! Runs the real migrations against an in-memory SQLite database (pinned to
//! a single connection, since the database lives and dies with it) and wires
//! the full service graph exactly as `main` does.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use milkrun_api::auth::{AuthConfig, AuthService};
use milkrun_api::config::AppConfig;
use milkrun_api::db::{establish_connection_with_config, run_migrations, DbConfig};
use milkrun_api::entities::{customer, delivery_boy, product};
use milkrun_api::events::{Event, EventSender};
use milkrun_api::services::AppServices;
use milkrun_api::slots;

pub struct TestContext {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub config: AppConfig,
    pub event_sender: EventSender,
    pub services: AppServices,
    // Keeps the channel open so service-side sends never error
    _event_rx: mpsc::Receiver<Event>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        jwt_secret: "integration-test-secret-key-which-is-definitely-long-enough-0123456789"
            .into(),
        jwt_expiration: 3600,
        host: "127.0.0.1".into(),
        port: 0,
        environment: "development".into(),
        log_level: "info".into(),
        log_json: false,
        auto_migrate: true,
        admin_email: "admin@milkrun.example".into(),
        admin_password: "admin-password".into(),
        shipping_fee_rupees: 50,
        tax_rate: 0.0,
        upi_payee_id: "milkrun@upi".into(),
        upi_payee_name: "Milkrun Dairy".into(),
        payment_session_ttl_minutes: 30,
        qr_image_endpoint: "https://api.qrserver.com/v1/create-qr-code/".into(),
        email_api_url: None,
        email_api_key: None,
        email_from: "orders@milkrun.example".into(),
        cors_allowed_origins: None,
        cors_allow_any_origin: false,
        rate_limit_requests_per_window: 1000,
        rate_limit_window_seconds: 60,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 30,
        db_idle_timeout_secs: 600,
        db_acquire_timeout_secs: 8,
        event_channel_capacity: 1024,
    }
}

impl TestContext {
    pub async fn new() -> Self {
        let cfg = test_config();
        let db = establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("in-memory sqlite");
        run_migrations(&db).await.expect("migrations");

        let db = Arc::new(db);
        let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
        let event_sender = EventSender::new(event_tx);
        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&cfg),
            db.clone(),
        ));
        let services = AppServices::new(db.clone(), event_sender.clone(), auth, &cfg);

        Self {
            db,
            config: cfg,
            event_sender,
            services,
            _event_rx: event_rx,
        }
    }

    /// The full HTTP router wired the way `main` wires it.
    pub fn router(&self) -> axum::Router {
        let state = milkrun_api::AppState {
            db: self.db.clone(),
            config: self.config.clone(),
            event_sender: self.event_sender.clone(),
            services: self.services.clone(),
        };
        axum::Router::new()
            .nest("/api/v1", milkrun_api::api_v1_routes())
            .nest(
                "/auth",
                milkrun_api::auth::auth_routes().with_state(self.services.auth.clone()),
            )
            .with_state(state)
    }

    pub async fn seed_customer(&self, name: &str, email: &str) -> customer::Model {
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            phone: Set(Some("9876543210".to_string())),
            password_hash: Set("test-hash".to_string()),
            area: Set(Some("sector-9".to_string())),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .expect("seed customer")
    }

    pub async fn seed_delivery_boy(&self, name: &str, email: &str) -> delivery_boy::Model {
        delivery_boy::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            phone: Set("9876501234".to_string()),
            password_hash: Set("test-hash".to_string()),
            areas: Set(Some("sector-9".to_string())),
            is_active: Set(true),
            total_deliveries: Set(0),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .expect("seed delivery boy")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            unit: Set("1L".to_string()),
            price: Set(price),
            discount_price: Set(None),
            stock_quantity: Set(stock),
            status: Set(product::Model::derived_status(
                product::ProductStatus::Active,
                stock,
            )),
            image_url: Set(None),
            category: Set(Some("milk".to_string())),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .expect("seed product")
    }

    pub async fn product_stock(&self, product_id: Uuid) -> i32 {
        self.services
            .catalog
            .get(product_id)
            .await
            .expect("product exists")
            .stock_quantity
    }
}

/// A fixed instant expressed in IST civil time.
pub fn ist_instant(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    slots::ist()
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("valid IST instant")
        .with_timezone(&Utc)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
