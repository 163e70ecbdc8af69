use crate::{
    auth::{roles, RoleRouteExt},
    entities::{processing_batch, raw_material},
    errors::ServiceError,
    handlers::common::{created_response, found},
    services::processing::{
        BatchFilters, BatchUpdate, CreateRawMaterialRequest, ProcessRawMaterialRequest,
        ProcessingStarted, RawMaterialFilters, UpdateBatchRequest,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};

/// Raw material intake and batch tracking. Reads are open to every role;
/// writes belong to admins and processors.
pub fn processing_routes() -> Router<AppState> {
    Router::new()
        .route("/raw-materials", get(list_raw_materials))
        .route(
            "/raw-materials",
            post(create_raw_material).with_roles(roles::PROCESSING),
        )
        .route("/raw-materials/:id", get(get_raw_material))
        .route(
            "/raw-materials/:id/process",
            post(process_raw_material).with_roles(roles::PROCESSING),
        )
        .route("/batches", get(list_batches))
        .route("/batches/:id", get(get_batch))
        .route("/batches/:id", put(update_batch).with_roles(roles::PROCESSING))
}

#[utoipa::path(
    get,
    path = "/api/v1/processing/raw-materials",
    params(RawMaterialFilters),
    responses((status = 200, description = "Raw materials listed", body = ApiResponse<Vec<raw_material::Model>>)),
    security(("bearer_auth" = [])),
    tag = "processing"
)]
pub async fn list_raw_materials(
    State(state): State<AppState>,
    Query(filters): Query<RawMaterialFilters>,
) -> ApiResult<Vec<raw_material::Model>> {
    let materials = state.services.processing.list_raw_materials(&filters).await?;
    Ok(Json(ApiResponse::success(materials)))
}

#[utoipa::path(
    get,
    path = "/api/v1/processing/raw-materials/{id}",
    params(("id" = i32, Path, description = "Raw material id")),
    responses(
        (status = 200, description = "Raw material found", body = ApiResponse<raw_material::Model>),
        (status = 404, description = "Raw material not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "processing"
)]
pub async fn get_raw_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<raw_material::Model> {
    let material = state.services.processing.get_raw_material(id).await?;
    Ok(Json(ApiResponse::success(found(material, "Raw material", id)?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/processing/raw-materials",
    request_body = CreateRawMaterialRequest,
    responses(
        (status = 201, description = "Raw material received", body = ApiResponse<raw_material::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "processing"
)]
pub async fn create_raw_material(
    State(state): State<AppState>,
    Json(payload): Json<CreateRawMaterialRequest>,
) -> Result<Response, ServiceError> {
    let material = state.services.processing.create_raw_material(payload).await?;
    Ok(created_response(material))
}

#[utoipa::path(
    post,
    path = "/api/v1/processing/raw-materials/{id}/process",
    params(("id" = i32, Path, description = "Raw material id")),
    request_body = ProcessRawMaterialRequest,
    responses(
        (status = 201, description = "Batch started", body = ApiResponse<ProcessingStarted>),
        (status = 404, description = "Raw material not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Raw material is not available", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "processing"
)]
pub async fn process_raw_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ProcessRawMaterialRequest>,
) -> Result<Response, ServiceError> {
    let started = state
        .services
        .processing
        .process_raw_material(id, payload)
        .await?;
    Ok(created_response(started))
}

#[utoipa::path(
    get,
    path = "/api/v1/processing/batches",
    params(BatchFilters),
    responses((status = 200, description = "Processing batches listed", body = ApiResponse<Vec<processing_batch::Model>>)),
    security(("bearer_auth" = [])),
    tag = "processing"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(filters): Query<BatchFilters>,
) -> ApiResult<Vec<processing_batch::Model>> {
    let batches = state.services.processing.list_batches(&filters).await?;
    Ok(Json(ApiResponse::success(batches)))
}

#[utoipa::path(
    get,
    path = "/api/v1/processing/batches/{id}",
    params(("id" = i32, Path, description = "Processing batch id")),
    responses(
        (status = 200, description = "Processing batch found", body = ApiResponse<processing_batch::Model>),
        (status = 404, description = "Processing batch not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "processing"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<processing_batch::Model> {
    let batch = state.services.processing.get_batch(id).await?;
    Ok(Json(ApiResponse::success(found(batch, "Processing batch", id)?)))
}

#[utoipa::path(
    put,
    path = "/api/v1/processing/batches/{id}",
    params(("id" = i32, Path, description = "Processing batch id")),
    request_body = UpdateBatchRequest,
    responses(
        (status = 200, description = "Batch updated; stockUpdate reports any product credit", body = ApiResponse<BatchUpdate>),
        (status = 400, description = "Invalid progress or status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Processing batch not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Batch is already finished", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "processing"
)]
pub async fn update_batch(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBatchRequest>,
) -> ApiResult<BatchUpdate> {
    let update = state.services.processing.update_batch(id, payload).await?;
    Ok(Json(ApiResponse::success(update)))
}
