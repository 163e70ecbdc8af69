use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AgriChain API",
        version = "0.1.0",
        description = r#"
# AgriChain Supply Chain API

Backend for a small agricultural supply chain: farmers record stock, processors
turn raw materials into products, transporters move shipments and admins manage
everyone.

## Authentication

Log in with `POST /api/v1/auth/login`. The session token comes back in the body
and as the http-only `session` cookie. Either send the cookie or the header:

```
Authorization: Bearer <token>
```

## Roles

- **Admin**: everything, including user management
- **Farmer**: inventory and shipments
- **Processor**: orders and processing batches
- **Transporter**: shipments

All authenticated roles may read every resource and the analytics.

## Error Handling

Failures share one body shape:

```json
{
  "error": "Conflict",
  "message": "Invalid status: Cannot change shipment status from Delivered to Scheduled",
  "request_id": "2b0c5e0e-1f6a-4f0e-9c1e-8d8a6f3f5b11",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

Money amounts are serialized as decimal strings.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and sessions"),
        (name = "users", description = "User management (admin)"),
        (name = "products", description = "Product catalog"),
        (name = "warehouses", description = "Storage sites"),
        (name = "inventory", description = "Quantity-at-location records"),
        (name = "orders", description = "Customer orders and their items"),
        (name = "shipments", description = "Shipment lifecycle"),
        (name = "processing", description = "Raw materials and processing batches"),
        (name = "Analytics", description = "Dashboard aggregations")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,

        // Users
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::update_user_status,
        crate::handlers::users::delete_user,

        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::list_categories,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        // Warehouses
        crate::handlers::warehouses::list_warehouses,
        crate::handlers::warehouses::get_warehouse,
        crate::handlers::warehouses::create_warehouse,
        crate::handlers::warehouses::update_warehouse,
        crate::handlers::warehouses::delete_warehouse,

        // Inventory
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::get_inventory,
        crate::handlers::inventory::create_inventory,
        crate::handlers::inventory::update_inventory,
        crate::handlers::inventory::adjust_inventory,
        crate::handlers::inventory::delete_inventory,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::get_order_items,
        crate::handlers::orders::add_order_item,
        crate::handlers::orders::remove_order_item,

        // Shipments
        crate::handlers::shipments::list_shipments,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::create_shipment,
        crate::handlers::shipments::update_shipment,
        crate::handlers::shipments::update_shipment_status,
        crate::handlers::shipments::delete_shipment,

        // Processing
        crate::handlers::processing::list_raw_materials,
        crate::handlers::processing::get_raw_material,
        crate::handlers::processing::create_raw_material,
        crate::handlers::processing::process_raw_material,
        crate::handlers::processing::list_batches,
        crate::handlers::processing::get_batch,
        crate::handlers::processing::update_batch,

        // Analytics
        crate::handlers::analytics::get_dashboard_summary,
        crate::handlers::analytics::get_sales_by_year,
        crate::handlers::analytics::get_quality_distribution,
        crate::handlers::analytics::get_inventory_levels,
        crate::handlers::analytics::get_transport_status,
        crate::handlers::analytics::get_order_status,
        crate::handlers::analytics::get_warehouse_utilization,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::errors::ErrorResponse,

            // Entities
            crate::entities::user::UserRole,
            crate::entities::user::UserStatus,
            crate::entities::user::UserProfile,
            crate::entities::product::Model,
            crate::entities::warehouse::Model,
            crate::entities::inventory::Model,
            crate::entities::order::Model,
            crate::entities::order::OrderStatus,
            crate::entities::order_item::Model,
            crate::entities::shipment::Model,
            crate::entities::shipment::ShipmentStatus,
            crate::entities::raw_material::Model,
            crate::entities::raw_material::RawMaterialStatus,
            crate::entities::processing_batch::Model,
            crate::entities::processing_batch::BatchStatus,
            crate::entities::quality_metric::Grade,

            // Requests and results
            crate::auth::SessionToken,
            crate::handlers::auth::LoginResponse,
            crate::services::users::RegisterRequest,
            crate::services::users::LoginRequest,
            crate::services::users::CreateUserRequest,
            crate::services::users::UpdateUserRequest,
            crate::services::users::UpdateUserStatusRequest,
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::warehouses::CreateWarehouseRequest,
            crate::services::warehouses::UpdateWarehouseRequest,
            crate::services::inventory::CreateInventoryRequest,
            crate::services::inventory::UpdateInventoryRequest,
            crate::services::inventory::AdjustInventoryRequest,
            crate::services::inventory::InventoryDetails,
            crate::services::inventory::InventoryAdjustment,
            crate::services::orders::OrderLineRequest,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::UpdateOrderRequest,
            crate::services::orders::OrderDetails,
            crate::services::orders::OrderItemDetails,
            crate::services::shipments::CreateShipmentRequest,
            crate::services::shipments::UpdateShipmentRequest,
            crate::services::shipments::UpdateShipmentStatusRequest,
            crate::services::processing::CreateRawMaterialRequest,
            crate::services::processing::ProcessRawMaterialRequest,
            crate::services::processing::UpdateBatchRequest,
            crate::services::processing::StockUpdate,
            crate::services::processing::BatchUpdate,
            crate::services::processing::ProcessingStarted,

            // Analytics
            crate::services::analytics::DashboardSummary,
            crate::services::analytics::MonthlySales,
            crate::services::analytics::QualityShare,
            crate::services::analytics::InventoryLevel,
            crate::services::analytics::ShipmentStatusCount,
            crate::services::analytics::OrderStatusCount,
            crate::services::analytics::WarehouseUtilization,
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
