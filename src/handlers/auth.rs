use crate::{
    auth::{AuthUser, SessionToken},
    entities::user::UserProfile,
    errors::ServiceError,
    handlers::common::{created_response, found},
    services::users::{LoginRequest, RegisterRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

/// Body of a successful login. The same token is also set as the session cookie.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub session: SessionToken,
    pub user: UserProfile,
}

/// Routes reachable without a session
pub fn public_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Routes that need the auth layer in front of them
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 403, description = "Role cannot be self-assigned", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ServiceError> {
    let profile = state.services.users.register(payload).await?;
    Ok(created_response(profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued; also set as the `session` cookie", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid email or password", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account is inactive", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ServiceError> {
    let user = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;
    let session = state.auth.issue_token(&user)?;
    let cookie = state.auth.session_cookie(&session.token)?;

    info!(user_id = user.id, role = %user.role, "User logged in");
    let body = LoginResponse {
        session,
        user: user.into(),
    };
    Ok(([(SET_COOKIE, cookie)], Json(ApiResponse::success(body))).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Session cookie cleared")),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(SET_COOKIE, state.auth.cleared_session_cookie())],
        Json(ApiResponse::success("Logged out")),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<UserProfile> {
    let profile = state.services.users.get_by_id(user.user_id).await?;
    Ok(Json(ApiResponse::success(found(profile, "User", user.user_id)?)))
}
