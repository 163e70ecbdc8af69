use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{Datelike, Utc};

use crate::{
    errors::ServiceError,
    services::analytics::{
        DashboardSummary, InventoryLevel, MonthlySales, OrderStatusCount, QualityQuery,
        QualityShare, SalesQuery, ShipmentStatusCount, WarehouseUtilization,
    },
    ApiResponse, AppState,
};

/// Build the analytics Router scoped under `/api/v1/analytics`.
pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard_summary))
        .route("/sales", get(get_sales_by_year))
        .route("/quality", get(get_quality_distribution))
        .route("/inventory", get(get_inventory_levels))
        .route("/transport", get(get_transport_status))
        .route("/orders", get(get_order_status))
        .route("/warehouses", get(get_warehouse_utilization))
}

/// Headline counts for the dashboard
#[utoipa::path(
    get,
    path = "/api/v1/analytics/dashboard",
    responses(
        (status = 200, description = "Dashboard summary retrieved successfully", body = ApiResponse<DashboardSummary>)
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn get_dashboard_summary(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardSummary>>, ServiceError> {
    let summary = state.services.analytics.dashboard_summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Monthly sales for a year
#[utoipa::path(
    get,
    path = "/api/v1/analytics/sales",
    params(SalesQuery),
    responses(
        (status = 200, description = "Monthly sales, January first", body = ApiResponse<Vec<MonthlySales>>),
        (status = 400, description = "Invalid year", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn get_sales_by_year(
    State(state): State<AppState>,
    Query(params): Query<SalesQuery>,
) -> Result<Json<ApiResponse<Vec<MonthlySales>>>, ServiceError> {
    let year = params.year.unwrap_or_else(|| Utc::now().year());

    if !(1900..=9999).contains(&year) {
        return Err(ServiceError::ValidationError(
            "Year must be between 1900 and 9999".to_string(),
        ));
    }

    let sales = state.services.analytics.sales_by_year(year).await?;
    Ok(Json(ApiResponse::success(sales)))
}

/// Average share per quality grade on a day
#[utoipa::path(
    get,
    path = "/api/v1/analytics/quality",
    params(QualityQuery),
    responses(
        (status = 200, description = "Quality distribution retrieved successfully", body = ApiResponse<Vec<QualityShare>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn get_quality_distribution(
    State(state): State<AppState>,
    Query(params): Query<QualityQuery>,
) -> Result<Json<ApiResponse<Vec<QualityShare>>>, ServiceError> {
    let distribution = state
        .services
        .analytics
        .quality_distribution(params.date)
        .await?;
    Ok(Json(ApiResponse::success(distribution)))
}

/// Inventory quantity per month
#[utoipa::path(
    get,
    path = "/api/v1/analytics/inventory",
    responses(
        (status = 200, description = "Inventory levels retrieved successfully", body = ApiResponse<Vec<InventoryLevel>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn get_inventory_levels(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<InventoryLevel>>>, ServiceError> {
    let levels = state.services.analytics.inventory_levels().await?;
    Ok(Json(ApiResponse::success(levels)))
}

/// Shipment counts per status
#[utoipa::path(
    get,
    path = "/api/v1/analytics/transport",
    responses(
        (status = 200, description = "Transport status retrieved successfully", body = ApiResponse<Vec<ShipmentStatusCount>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn get_transport_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ShipmentStatusCount>>>, ServiceError> {
    let counts = state.services.analytics.transport_status().await?;
    Ok(Json(ApiResponse::success(counts)))
}

/// Order counts per status
#[utoipa::path(
    get,
    path = "/api/v1/analytics/orders",
    responses(
        (status = 200, description = "Order status retrieved successfully", body = ApiResponse<Vec<OrderStatusCount>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn get_order_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<OrderStatusCount>>>, ServiceError> {
    let counts = state.services.analytics.order_status().await?;
    Ok(Json(ApiResponse::success(counts)))
}

/// Stored warehouse usage against summed inventory
#[utoipa::path(
    get,
    path = "/api/v1/analytics/warehouses",
    responses(
        (status = 200, description = "Warehouse utilization retrieved successfully", body = ApiResponse<Vec<WarehouseUtilization>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn get_warehouse_utilization(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<WarehouseUtilization>>>, ServiceError> {
    let utilization = state.services.analytics.warehouse_utilization().await?;
    Ok(Json(ApiResponse::success(utilization)))
}
