use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};

/// Manual ledger adjustment, e.g. a stocktake correction.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockBody {
    pub location: String,
    pub product_id: String,
    /// Signed delta; negative debits fail rather than clamp.
    pub delta: i32,
    pub reason: String,
    pub reference: Option<String>,
}

/// Reservation and release both use the same shape.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReserveStockBody {
    pub location: String,
    pub product_id: String,
    pub quantity: i32,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderLevelBody {
    pub location: String,
    pub product_id: String,
    pub reorder_level: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowStockQuery {
    pub location: Option<String>,
}

pub fn warehouse_router() -> Router<AppState> {
    Router::new()
        .route("/:location/snapshot", get(get_snapshot))
        .route("/low-stock", get(get_low_stock))
        .route("/adjust", post(adjust_stock))
        .route("/reserve", post(reserve_stock))
        .route("/release", post(release_stock))
        .route("/reorder-level", put(set_reorder_level))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/{location}/snapshot",
    params(("location" = String, Path, description = "Warehouse or branch location key")),
    responses((status = 200, description = "All products at the location")),
    tag = "warehouse"
)]
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let snapshot = state.services.ledger.snapshot(&location).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/low-stock",
    params(LowStockQuery),
    responses((status = 200, description = "Records at or below their reorder level")),
    tag = "warehouse"
)]
pub async fn get_low_stock(
    State(state): State<AppState>,
    Query(query): Query<LowStockQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let records = state
        .services
        .ledger
        .low_stock(query.location.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(records)))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/adjust",
    request_body = AdjustStockBody,
    responses(
        (status = 200, description = "Ledger adjusted"),
        (status = 422, description = "Debit would go negative; nothing was changed")
    ),
    tag = "warehouse"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Json(body): Json<AdjustStockBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .ledger
        .adjust(
            &body.location,
            &body.product_id,
            body.delta,
            &body.reason,
            body.reference.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/reserve",
    request_body = ReserveStockBody,
    responses(
        (status = 200, description = "Stock reserved"),
        (status = 422, description = "Not enough available stock")
    ),
    tag = "warehouse"
)]
pub async fn reserve_stock(
    State(state): State<AppState>,
    Json(body): Json<ReserveStockBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .ledger
        .reserve(
            &body.location,
            &body.product_id,
            body.quantity,
            body.reference.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/release",
    request_body = ReserveStockBody,
    responses(
        (status = 200, description = "Reservation released"),
        (status = 400, description = "Release exceeds the reserved quantity")
    ),
    tag = "warehouse"
)]
pub async fn release_stock(
    State(state): State<AppState>,
    Json(body): Json<ReserveStockBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .ledger
        .release(
            &body.location,
            &body.product_id,
            body.quantity,
            body.reference.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    put,
    path = "/api/v1/warehouse/reorder-level",
    request_body = ReorderLevelBody,
    responses((status = 200, description = "Reorder level updated")),
    tag = "warehouse"
)]
pub async fn set_reorder_level(
    State(state): State<AppState>,
    Json(body): Json<ReorderLevelBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .ledger
        .set_reorder_level(&body.location, &body.product_id, body.reorder_level)
        .await?;
    Ok(Json(ApiResponse::success(record)))
}
