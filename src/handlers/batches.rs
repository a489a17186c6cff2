use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::errors::ServiceError;
use crate::services::batches::BatchImportInput;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchMoveBody {
    pub quantity: i32,
    /// Destination branch for dispatch, receiving location for receipt.
    pub location: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BatchListQuery {
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpiringQuery {
    /// Window in days from today; defaults to 60.
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FefoPlanQuery {
    pub location: String,
    pub product_id: String,
    pub quantity: i32,
}

pub fn batches_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_batches))
        .route("/import", post(import_batch))
        .route("/statistics", get(batch_statistics))
        .route("/expiring", get(expiring_batches))
        .route("/fefo-plan", get(fefo_plan))
        .route("/:barcode", get(get_batch).delete(remove_batch))
        .route("/:barcode/dispatch", post(dispatch_batch))
        .route("/:barcode/receive", post(receive_batch))
}

#[utoipa::path(
    post,
    path = "/api/v1/batches/import",
    request_body = BatchImportInput,
    responses(
        (status = 201, description = "Batch imported and ledger credited"),
        (status = 400, description = "Missing or malformed import fields")
    ),
    tag = "batches"
)]
pub async fn import_batch(
    State(state): State<AppState>,
    Json(input): Json<BatchImportInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let batch = state
        .services
        .batches
        .import_batch(input, "Goods-In")
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(batch))))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches",
    params(BatchListQuery),
    responses((status = 200, description = "Batches ordered by expiry")),
    tag = "batches"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let batches = state
        .services
        .batches
        .list(query.location.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(batches)))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches/{barcode}",
    params(("barcode" = String, Path, description = "Batch barcode or id")),
    responses(
        (status = 200, description = "Batch"),
        (status = 404, description = "Unknown batch")
    ),
    tag = "batches"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let batch = state.services.batches.get_by_barcode(&barcode).await?;
    Ok(Json(ApiResponse::success(batch)))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches/fefo-plan",
    params(FefoPlanQuery),
    responses((status = 200, description = "FEFO allocation plan; no stock is mutated")),
    tag = "batches"
)]
pub async fn fefo_plan(
    State(state): State<AppState>,
    Query(query): Query<FefoPlanQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let plan = state
        .services
        .batches
        .select_batches(&query.location, &query.product_id, query.quantity)
        .await?;
    Ok(Json(ApiResponse::success(plan)))
}

#[utoipa::path(
    post,
    path = "/api/v1/batches/{barcode}/dispatch",
    request_body = BatchMoveBody,
    responses(
        (status = 200, description = "Batch stock dispatched"),
        (status = 422, description = "Batch holds less than the requested quantity")
    ),
    tag = "batches"
)]
pub async fn dispatch_batch(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
    Json(body): Json<BatchMoveBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = body.actor.unwrap_or_else(|| "Warehouse Team".to_string());
    let batch = state
        .services
        .batches
        .dispatch_by_barcode(&barcode, body.quantity, body.location.as_deref(), &actor)
        .await?;
    Ok(Json(ApiResponse::success(batch)))
}

#[utoipa::path(
    post,
    path = "/api/v1/batches/{barcode}/receive",
    request_body = BatchMoveBody,
    responses((status = 200, description = "Batch stock received back")),
    tag = "batches"
)]
pub async fn receive_batch(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
    Json(body): Json<BatchMoveBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = body.actor.unwrap_or_else(|| "Warehouse Team".to_string());
    let batch = state
        .services
        .batches
        .receive_by_barcode(&barcode, body.quantity, body.location.as_deref(), &actor)
        .await?;
    Ok(Json(ApiResponse::success(batch)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/batches/{barcode}",
    params(("barcode" = String, Path, description = "Batch barcode or id")),
    responses(
        (status = 200, description = "Batch removed; remaining stock debited"),
        (status = 404, description = "Unknown batch")
    ),
    tag = "batches"
)]
pub async fn remove_batch(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let batch = state.services.batches.remove_batch(&barcode).await?;
    Ok(Json(ApiResponse::success(batch)))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches/expiring",
    params(ExpiringQuery),
    responses((status = 200, description = "Batches expiring within the window")),
    tag = "batches"
)]
pub async fn expiring_batches(
    State(state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let batches = state
        .services
        .batches
        .expiring_within(query.days.unwrap_or(60))
        .await?;
    Ok(Json(ApiResponse::success(batches)))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches/statistics",
    responses((status = 200, description = "Batch store statistics")),
    tag = "batches"
)]
pub async fn batch_statistics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let stats = state.services.batches.statistics().await?;
    Ok(Json(ApiResponse::success(stats)))
}
