use crate::{
    auth::{roles, RoleRouteExt},
    entities::order,
    errors::ServiceError,
    handlers::common::{created_response, deleted, found},
    services::orders::{
        CreateOrderRequest, OrderDetails, OrderFilters, OrderItemDetails, OrderLineRequest,
        UpdateOrderRequest,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};

/// Order routes: writes are limited to admins and processors
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/", post(create_order).with_roles(roles::ORDERS_WRITE))
        .route("/:id", get(get_order))
        .route("/:id", put(update_order).with_roles(roles::ORDERS_WRITE))
        .route("/:id", delete(delete_order).with_roles(roles::ORDERS_WRITE))
        .route("/:id/items", get(get_order_items))
        .route(
            "/:id/items",
            post(add_order_item).with_roles(roles::ORDERS_WRITE),
        )
        .route(
            "/:id/items/:item_id",
            delete(remove_order_item).with_roles(roles::ORDERS_WRITE),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderFilters),
    responses(
        (status = 200, description = "Orders listed, newest first", body = ApiResponse<Vec<order::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filters): Query<OrderFilters>,
) -> ApiResult<Vec<order::Model>> {
    let orders = state.services.orders.list(&filters).await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its items", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<OrderDetails> {
    let details = state.services.orders.get_order_details(id).await?;
    Ok(Json(ApiResponse::success(found(details, "Order", id)?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created with catalog prices captured", body = ApiResponse<OrderDetails>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Response, ServiceError> {
    let details = state.services.orders.create_order(payload).await?;
    Ok(created_response(details))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<order::Model>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Status cannot move backwards", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderRequest>,
) -> ApiResult<order::Model> {
    let order = state.services.orders.update(id, payload).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order and its items deleted"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let removed = state.services.orders.delete(id).await?;
    deleted(removed, "Order", id)
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/items",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Items of the order", body = ApiResponse<Vec<OrderItemDetails>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_items(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Vec<OrderItemDetails>> {
    let items = state.services.orders.list_for_order(id).await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items",
    params(("id" = i32, Path, description = "Order id")),
    request_body = OrderLineRequest,
    responses(
        (status = 201, description = "Item added; order total recomputed", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order or product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn add_order_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<OrderLineRequest>,
) -> Result<Response, ServiceError> {
    let details = state.services.orders.add_item(id, payload).await?;
    Ok(created_response(details))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}/items/{item_id}",
    params(
        ("id" = i32, Path, description = "Order id"),
        ("item_id" = i32, Path, description = "Order item id")
    ),
    responses(
        (status = 200, description = "Item removed; order total recomputed", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order or item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn remove_order_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i32, i32)>,
) -> ApiResult<OrderDetails> {
    let details = state.services.orders.remove_item(id, item_id).await?;
    Ok(Json(ApiResponse::success(details)))
}
