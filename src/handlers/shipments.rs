use crate::{
    auth::{roles, RoleRouteExt},
    entities::shipment,
    errors::ServiceError,
    handlers::common::{created_response, deleted, found},
    services::shipments::{
        CreateShipmentRequest, ShipmentFilters, UpdateShipmentRequest, UpdateShipmentStatusRequest,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};

/// Shipment routes: admins, farmers and transporters write; only admins delete
pub fn shipments_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shipments))
        .route("/", post(create_shipment).with_roles(roles::SHIPMENTS_WRITE))
        .route("/:id", get(get_shipment))
        .route("/:id", put(update_shipment).with_roles(roles::SHIPMENTS_WRITE))
        .route("/:id", delete(delete_shipment).with_roles(roles::ADMIN))
        .route(
            "/:id/status",
            put(update_shipment_status).with_roles(roles::SHIPMENTS_WRITE),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    params(ShipmentFilters),
    responses(
        (status = 200, description = "Shipments listed", body = ApiResponse<Vec<shipment::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Query(filters): Query<ShipmentFilters>,
) -> ApiResult<Vec<shipment::Model>> {
    let shipments = state.services.shipments.list(&filters).await?;
    Ok(Json(ApiResponse::success(shipments)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}",
    params(("id" = i32, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment found", body = ApiResponse<shipment::Model>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<shipment::Model> {
    let shipment = state.services.shipments.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(found(shipment, "Shipment", id)?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment scheduled", body = ApiResponse<shipment::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment number already used", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(payload): Json<CreateShipmentRequest>,
) -> Result<Response, ServiceError> {
    let shipment = state.services.shipments.create(payload).await?;
    Ok(created_response(shipment))
}

#[utoipa::path(
    put,
    path = "/api/v1/shipments/{id}",
    params(("id" = i32, Path, description = "Shipment id")),
    request_body = UpdateShipmentRequest,
    responses(
        (status = 200, description = "Shipment updated", body = ApiResponse<shipment::Model>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Status transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn update_shipment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateShipmentRequest>,
) -> ApiResult<shipment::Model> {
    let shipment = state.services.shipments.update(id, payload).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

#[utoipa::path(
    put,
    path = "/api/v1/shipments/{id}/status",
    params(("id" = i32, Path, description = "Shipment id")),
    request_body = UpdateShipmentStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<shipment::Model>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Status transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn update_shipment_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateShipmentStatusRequest>,
) -> ApiResult<shipment::Model> {
    let shipment = state
        .services
        .shipments
        .update_status(id, payload.status)
        .await?;
    Ok(Json(ApiResponse::success(shipment)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shipments/{id}",
    params(("id" = i32, Path, description = "Shipment id")),
    responses(
        (status = 204, description = "Shipment deleted"),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn delete_shipment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let removed = state.services.shipments.delete(id).await?;
    deleted(removed, "Shipment", id)
}
