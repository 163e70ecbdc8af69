use crate::{
    auth::{roles, RoleRouteExt},
    entities::inventory,
    errors::ServiceError,
    handlers::common::{created_response, deleted, found},
    services::inventory::{
        AdjustInventoryRequest, CreateInventoryRequest, InventoryAdjustment, InventoryDetails,
        InventoryFilters, UpdateInventoryRequest,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};

/// Inventory routes: writes are limited to admins and farmers
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory))
        .route("/", post(create_inventory).with_roles(roles::INVENTORY_WRITE))
        .route("/:id", get(get_inventory))
        .route("/:id", put(update_inventory).with_roles(roles::INVENTORY_WRITE))
        .route("/:id", delete(delete_inventory).with_roles(roles::INVENTORY_WRITE))
        .route(
            "/:id/adjust",
            post(adjust_inventory).with_roles(roles::INVENTORY_WRITE),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryFilters),
    responses(
        (status = 200, description = "Inventory entries with their product and warehouse", body = ApiResponse<Vec<InventoryDetails>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(filters): Query<InventoryFilters>,
) -> ApiResult<Vec<InventoryDetails>> {
    let entries = state.services.inventory.list(&filters).await?;
    Ok(Json(ApiResponse::success(entries)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    params(("id" = i32, Path, description = "Inventory entry id")),
    responses(
        (status = 200, description = "Inventory entry found", body = ApiResponse<inventory::Model>),
        (status = 404, description = "Inventory entry not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<inventory::Model> {
    let entry = state.services.inventory.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(found(entry, "Inventory entry", id)?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryRequest,
    responses(
        (status = 201, description = "Inventory recorded", body = ApiResponse<inventory::Model>),
        (status = 404, description = "Product or warehouse not found", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    Json(payload): Json<CreateInventoryRequest>,
) -> Result<Response, ServiceError> {
    let entry = state.services.inventory.create(payload).await?;
    Ok(created_response(entry))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = i32, Path, description = "Inventory entry id")),
    request_body = UpdateInventoryRequest,
    responses(
        (status = 200, description = "Inventory entry updated", body = ApiResponse<inventory::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn update_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateInventoryRequest>,
) -> ApiResult<inventory::Model> {
    let entry = state.services.inventory.update(id, payload).await?;
    Ok(Json(ApiResponse::success(entry)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/adjust",
    params(("id" = i32, Path, description = "Inventory entry id")),
    request_body = AdjustInventoryRequest,
    responses(
        (status = 200, description = "Quantity set and catalog price updated when given", body = ApiResponse<InventoryAdjustment>),
        (status = 400, description = "Invalid quantity or price", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AdjustInventoryRequest>,
) -> ApiResult<InventoryAdjustment> {
    let adjustment = state.services.inventory.update_inventory(id, payload).await?;
    Ok(Json(ApiResponse::success(adjustment)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(("id" = i32, Path, description = "Inventory entry id")),
    responses(
        (status = 204, description = "Inventory entry deleted"),
        (status = 404, description = "Inventory entry not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn delete_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let removed = state.services.inventory.delete(id).await?;
    deleted(removed, "Inventory entry", id)
}
