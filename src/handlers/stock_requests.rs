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
use crate::services::stock_requests::{
    CreateStockRequestInput, StockRequestFilter, UpdateStockRequestInput,
};
use crate::{ApiResponse, AppState};

/// Approval decision submitted by one role in the chain.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveRequestBody {
    /// Role making the decision, e.g. "stock_manager", "gm", "warehouse".
    pub role: String,
    /// Defaults to an approval when omitted.
    pub approved: Option<bool>,
    pub approved_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockRequestQuery {
    pub branch: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u64>,
}

pub fn stock_requests_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_stock_request).get(list_stock_requests))
        .route("/:id", get(get_stock_request).put(update_stock_request))
        .route("/:id/approve", post(approve_stock_request))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock-requests",
    request_body = CreateStockRequestInput,
    responses(
        (status = 201, description = "Stock request created"),
        (status = 400, description = "Validation failed")
    ),
    tag = "stock-requests"
)]
pub async fn create_stock_request(
    State(state): State<AppState>,
    Json(input): Json<CreateStockRequestInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = state.services.stock_requests.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(request))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-requests",
    params(StockRequestQuery),
    responses((status = 200, description = "Stock requests matching the filter")),
    tag = "stock-requests"
)]
pub async fn list_stock_requests(
    State(state): State<AppState>,
    Query(query): Query<StockRequestQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let requests = state
        .services
        .stock_requests
        .list(StockRequestFilter {
            branch: query.branch,
            status: query.status,
            limit: query.limit,
        })
        .await?;
    Ok(Json(ApiResponse::success(requests)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-requests/{id}",
    params(("id" = String, Path, description = "Request id or request number")),
    responses(
        (status = 200, description = "Stock request"),
        (status = 404, description = "Unknown request")
    ),
    tag = "stock-requests"
)]
pub async fn get_stock_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = state.services.stock_requests.get(&id).await?;
    Ok(Json(ApiResponse::success(request)))
}

#[utoipa::path(
    put,
    path = "/api/v1/stock-requests/{id}",
    request_body = UpdateStockRequestInput,
    responses(
        (status = 200, description = "Stock request updated"),
        (status = 409, description = "Request is terminal and cannot be edited")
    ),
    tag = "stock-requests"
)]
pub async fn update_stock_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateStockRequestInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = state.services.stock_requests.update(&id, input).await?;
    Ok(Json(ApiResponse::success(request)))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock-requests/{id}/approve",
    request_body = ApproveRequestBody,
    responses(
        (status = 200, description = "Approval recorded; terminal requests are returned unchanged"),
        (status = 404, description = "Unknown request")
    ),
    tag = "stock-requests"
)]
pub async fn approve_stock_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ApproveRequestBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = body.approved_by.unwrap_or_else(|| "Approver".to_string());
    let request = state
        .services
        .stock_requests
        .advance(
            &id,
            &body.role,
            body.approved.unwrap_or(true),
            &actor,
            body.notes.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::success(request)))
}
