//! Authentication and authorization.
//!
//! Three bearer-token shapes share one HS256 signing key and are told apart
//! by the `role` claim: customer, admin, delivery boy. The admin identity is
//! environment-configured and not a stored record, so its subject is the
//! `Actor::SystemAdmin` sentinel.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{customer, delivery_boy, Actor};

/// Role discriminator carried in every token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TokenRole {
    Customer,
    Admin,
    DeliveryBoy,
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: TokenRole,
    pub name: Option<String>,
    pub email: Option<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller extracted from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub subject: String,
    pub role: TokenRole,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == TokenRole::Admin
    }

    /// The caller's customer id; admin and delivery tokens have none.
    pub fn customer_id(&self) -> Result<Uuid, AuthError> {
        if self.role != TokenRole::Customer {
            return Err(AuthError::InsufficientRole);
        }
        Uuid::parse_str(&self.subject).map_err(|_| AuthError::InvalidToken("bad subject".into()))
    }

    pub fn delivery_boy_id(&self) -> Result<Uuid, AuthError> {
        if self.role != TokenRole::DeliveryBoy {
            return Err(AuthError::InsufficientRole);
        }
        Uuid::parse_str(&self.subject).map_err(|_| AuthError::InvalidToken("bad subject".into()))
    }

    /// The caller as an audit actor.
    pub fn actor(&self) -> Actor {
        match self.role {
            TokenRole::Admin => Actor::SystemAdmin,
            _ => Uuid::parse_str(&self.subject)
                .map(Actor::Customer)
                .unwrap_or(Actor::SystemAdmin),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiration_secs: usize,
    pub admin_email: String,
    pub admin_password: String,
}

impl AuthConfig {
    pub fn from_app_config(cfg: &crate::config::AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            token_expiration_secs: cfg.jwt_expiration,
            admin_email: cfg.admin_email.clone(),
            admin_password: cfg.admin_password.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authentication token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token creation failed: {0}")]
    TokenCreation(String),
    #[error("invalid email or password")]
    WrongCredentials,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("this account already exists")]
    AccountExists,
    #[error("insufficient role for this endpoint")]
    InsufficientRole,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken(_) | Self::WrongCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::AccountDisabled | Self::InsufficientRole => StatusCode::FORBIDDEN,
            Self::AccountExists => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::TokenCreation(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for crate::errors::ServiceError {
    fn from(err: AuthError) -> Self {
        use crate::errors::ServiceError;
        match err {
            AuthError::InsufficientRole | AuthError::AccountDisabled => {
                ServiceError::Forbidden(err.to_string())
            }
            AuthError::AccountExists => ServiceError::Conflict(err.to_string()),
            AuthError::Validation(msg) => ServiceError::ValidationError(msg),
            AuthError::TokenCreation(msg) | AuthError::Internal(msg) => {
                ServiceError::InternalError(msg)
            }
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Never leak internals to the client
            AuthError::TokenCreation(_) | AuthError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = crate::errors::ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            details: None,
            request_id: crate::middleware_helpers::request_id::current_request_id(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

/// Authentication service handling token issuance, validation and logins.
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Issues a signed token for the given subject and role.
    pub fn issue_token(
        &self,
        subject: &str,
        role: TokenRole,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let expires_in = self.config.token_expiration_secs as i64;
        let exp = now + ChronoDuration::seconds(expires_in);

        let claims = Claims {
            sub: subject.to_string(),
            role,
            name,
            email,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        tracing::debug!(subject, role = %role, "token issued");

        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in,
            role,
        })
    }

    /// Validates a token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Registers a storefront customer account.
    #[instrument(skip(self, req))]
    pub async fn register_customer(
        &self,
        req: RegisterRequest,
    ) -> Result<TokenResponse, AuthError> {
        req.validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let existing = customer::Entity::find()
            .filter(customer::Column::Email.eq(req.email.clone()))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if existing.is_some() {
            return Err(AuthError::AccountExists);
        }

        let id = Uuid::new_v4();
        let account = customer::ActiveModel {
            id: Set(id),
            name: Set(req.name.clone()),
            email: Set(req.email.clone()),
            phone: Set(req.phone.clone()),
            password_hash: Set(self.hash_password(&req.password)?),
            area: Set(req.area.clone()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        account
            .insert(&*self.db)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        info!(customer_id = %id, "customer registered");
        self.issue_token(
            &id.to_string(),
            TokenRole::Customer,
            Some(req.name),
            Some(req.email),
        )
    }

    /// Customer login with email and password.
    #[instrument(skip(self, password))]
    pub async fn login_customer(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, AuthError> {
        let account = customer::Entity::find()
            .filter(customer::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::WrongCredentials)?;

        if !self.verify_password(password, &account.password_hash) {
            return Err(AuthError::WrongCredentials);
        }
        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.issue_token(
            &account.id.to_string(),
            TokenRole::Customer,
            Some(account.name),
            Some(account.email),
        )
    }

    /// Delivery-personnel login.
    #[instrument(skip(self, password))]
    pub async fn login_delivery(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, AuthError> {
        let account = delivery_boy::Entity::find()
            .filter(delivery_boy::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::WrongCredentials)?;

        if !self.verify_password(password, &account.password_hash) {
            return Err(AuthError::WrongCredentials);
        }
        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.issue_token(
            &account.id.to_string(),
            TokenRole::DeliveryBoy,
            Some(account.name),
            Some(account.email),
        )
    }

    /// Back-office login against the environment-configured credentials.
    #[instrument(skip(self, password))]
    pub async fn login_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, AuthError> {
        if email != self.config.admin_email || password != self.config.admin_password {
            warn!("rejected admin login attempt");
            return Err(AuthError::WrongCredentials);
        }
        self.issue_token(
            &Actor::SystemAdmin.to_string(),
            TokenRole::Admin,
            None,
            Some(email.to_string()),
        )
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MissingToken)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::MissingToken)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    crate::AppState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = crate::AppState::from_ref(state);
        let token = bearer_token(parts)?;
        let claims = app.services.auth.validate_token(token)?;
        Ok(AuthUser {
            subject: claims.sub,
            role: claims.role,
            name: claims.name,
            email: claims.email,
        })
    }
}

/// Extractor that additionally requires the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    crate::AppState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != TokenRole::Admin {
            return Err(AuthError::InsufficientRole);
        }
        Ok(AdminUser(user))
    }
}

/// Extractor that additionally requires the delivery-boy role.
#[derive(Debug, Clone)]
pub struct DeliveryUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for DeliveryUser
where
    S: Send + Sync,
    crate::AppState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != TokenRole::DeliveryBoy {
            return Err(AuthError::InsufficientRole);
        }
        Ok(DeliveryUser(user))
    }
}

// ---- Auth HTTP surface ----

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub role: TokenRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub area: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Authentication routes
pub fn auth_routes() -> Router<Arc<AuthService>> {
    use axum::routing::post;
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/delivery/login", post(delivery_login_handler))
        .route("/admin/login", post(admin_login_handler))
}

async fn register_handler(
    State(auth): State<Arc<AuthService>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    auth.register_customer(req).await.map(Json)
}

async fn login_handler(
    State(auth): State<Arc<AuthService>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    auth.login_customer(&req.email, &req.password).await.map(Json)
}

async fn delivery_login_handler(
    State(auth): State<Arc<AuthService>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    auth.login_delivery(&req.email, &req.password).await.map(Json)
}

async fn admin_login_handler(
    State(auth): State<Arc<AuthService>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    auth.login_admin(&req.email, &req.password).await.map(Json)
}
