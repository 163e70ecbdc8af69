use crate::{
    auth::{roles, RoleRouteExt},
    entities::warehouse,
    errors::ServiceError,
    handlers::common::{created_response, deleted, found},
    services::warehouses::{CreateWarehouseRequest, UpdateWarehouseRequest, WarehouseFilters},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};

pub fn warehouses_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_warehouses))
        .route("/", post(create_warehouse).with_roles(roles::ADMIN))
        .route("/:id", get(get_warehouse))
        .route("/:id", put(update_warehouse).with_roles(roles::ADMIN))
        .route("/:id", delete(delete_warehouse).with_roles(roles::ADMIN))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    params(WarehouseFilters),
    responses((status = 200, description = "Warehouses listed", body = ApiResponse<Vec<warehouse::Model>>)),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(filters): Query<WarehouseFilters>,
) -> ApiResult<Vec<warehouse::Model>> {
    let warehouses = state.services.warehouses.list(&filters).await?;
    Ok(Json(ApiResponse::success(warehouses)))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses/{id}",
    params(("id" = i32, Path, description = "Warehouse id")),
    responses(
        (status = 200, description = "Warehouse found", body = ApiResponse<warehouse::Model>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<warehouse::Model> {
    let warehouse = state.services.warehouses.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(found(warehouse, "Warehouse", id)?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouses",
    request_body = CreateWarehouseRequest,
    responses(
        (status = 201, description = "Warehouse created", body = ApiResponse<warehouse::Model>),
        (status = 400, description = "Used exceeds capacity", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(payload): Json<CreateWarehouseRequest>,
) -> Result<Response, ServiceError> {
    let warehouse = state.services.warehouses.create(payload).await?;
    Ok(created_response(warehouse))
}

#[utoipa::path(
    put,
    path = "/api/v1/warehouses/{id}",
    params(("id" = i32, Path, description = "Warehouse id")),
    request_body = UpdateWarehouseRequest,
    responses(
        (status = 200, description = "Warehouse updated", body = ApiResponse<warehouse::Model>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn update_warehouse(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateWarehouseRequest>,
) -> ApiResult<warehouse::Model> {
    let warehouse = state.services.warehouses.update(id, payload).await?;
    Ok(Json(ApiResponse::success(warehouse)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/warehouses/{id}",
    params(("id" = i32, Path, description = "Warehouse id")),
    responses(
        (status = 204, description = "Warehouse deleted"),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Warehouse still holds inventory", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn delete_warehouse(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let removed = state.services.warehouses.delete(id).await?;
    deleted(removed, "Warehouse", id)
}
