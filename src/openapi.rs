use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Milkrun API",
        version = "0.3.0",
        description = r#"
# Milkrun Dairy Delivery API

Backend for a direct-to-consumer dairy delivery platform.

## Features

- **Storefront**: browse products, place and track orders, cancel within the shift cutoff
- **Delivery scheduling**: 7-day slot calendar with a fixed civil-time cutoff (IST)
- **Order lifecycle**: pending, confirmed, delivered, cancelled with stock commit/restore
- **Delivery dispatch**: per-customer assignment, route sequencing, work queues
- **UPI payments**: QR-coded payment sessions with admin verification
- **Back office**: order management, payment verification, delivery personnel, reporting

## Authentication

All protected endpoints take a bearer token. Three token shapes exist
(customer, admin, delivery) distinguished by the `role` claim:

```
Authorization: Bearer <your-jwt-token>
```
"#,
        contact(name = "Milkrun Support", email = "support@milkrun.example"),
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Product catalog"),
        (name = "Orders", description = "Order placement and lifecycle"),
        (name = "Delivery", description = "Delivery personnel endpoints"),
        (name = "Payments", description = "UPI payment sessions"),
        (name = "Admin", description = "Back-office endpoints")
    ),
    paths(
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::orders::delivery_slots,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::delivery::work_queue,
        crate::handlers::delivery::mark_delivered,
        crate::handlers::payments::create_session,
        crate::handlers::payments::complete_session,
        crate::handlers::payments::get_session,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::slots::DaySlots,
        crate::slots::ShiftAvailability,
        crate::entities::product::Model,
        crate::entities::product::ProductStatus,
        crate::entities::order::OrderStatus,
        crate::entities::order::OrderPaymentStatus,
        crate::entities::order::PaymentMethod,
        crate::entities::order::DeliveryShift,
        crate::entities::order::OrderPriority,
        crate::entities::order_item::Model,
        crate::entities::payment::PaymentSessionStatus,
        crate::entities::payment::VerificationStatus,
        crate::services::orders::CreateOrderRequest,
        crate::services::orders::CreateOrderItem,
        crate::services::orders::ShippingAddress,
        crate::services::orders::MarkDeliveredRequest,
        crate::services::orders::OrderResponse,
        crate::services::orders::OrderListResponse,
        crate::services::orders::WorkQueueGroup,
        crate::services::catalog::ProductListResponse,
        crate::services::payments::CreateSessionRequest,
        crate::services::payments::CompleteSessionRequest,
        crate::services::payments::PaymentSessionResponse,
        crate::handlers::orders::CancelOrderRequest,
        crate::auth::TokenResponse,
        crate::auth::RegisterRequest,
        crate::auth::LoginRequest,
    ))
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
