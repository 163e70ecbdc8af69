use crate::{
    auth::{roles, RoleRouteExt},
    entities::user::UserProfile,
    errors::ServiceError,
    handlers::common::{created_response, deleted, found},
    services::users::{CreateUserRequest, UpdateUserRequest, UpdateUserStatusRequest, UserFilters},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};

/// User management; every route is admin only
pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).with_roles(roles::ADMIN))
        .route("/", post(create_user).with_roles(roles::ADMIN))
        .route("/:id", get(get_user).with_roles(roles::ADMIN))
        .route("/:id", put(update_user).with_roles(roles::ADMIN))
        .route("/:id", delete(delete_user).with_roles(roles::ADMIN))
        .route("/:id/status", put(update_user_status).with_roles(roles::ADMIN))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserFilters),
    responses(
        (status = 200, description = "Users listed", body = ApiResponse<Vec<UserProfile>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(filters): Query<UserFilters>,
) -> ApiResult<Vec<UserProfile>> {
    let users = state.services.users.list(&filters).await?;
    Ok(Json(ApiResponse::success(users)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserProfile>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<UserProfile> {
    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(found(user, "User", id)?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Response, ServiceError> {
    let user = state.services.users.create(payload).await?;
    Ok(created_response(user))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserProfile>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<UserProfile> {
    let user = state.services.users.update(id, payload).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/status",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<UserProfile>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserStatusRequest>,
) -> ApiResult<UserProfile> {
    let user = state.services.users.set_status(id, payload.status).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let removed = state.services.users.delete(id).await?;
    deleted(removed, "User", id)
}
