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
use crate::services::transfers::{
    CreateTransferInput, DispatchMeta, DispatchNoteFilter, TransferFilter,
};
use crate::{ApiResponse, AppState};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DispatchBody {
    pub dispatched_by: Option<String>,
    pub dispatch_notes: Option<String>,
    pub expected_arrival: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ActorBody {
    pub actor: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransferQuery {
    pub status: Option<String>,
    pub to_branch: Option<String>,
    pub from_warehouse: Option<String>,
    pub request_id: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DispatchNoteQuery {
    pub transfer_id: Option<String>,
    pub barcode: Option<String>,
    pub status: Option<String>,
    pub to_branch: Option<String>,
    pub from_warehouse: Option<String>,
}

pub fn transfers_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transfer).get(list_transfers))
        .route("/dispatch-notes", get(list_dispatch_notes))
        .route("/:id", get(get_transfer))
        .route("/:id/dispatch", post(dispatch_transfer))
        .route("/:id/deliver", post(deliver_transfer))
        .route("/:id/receive", post(receive_transfer))
        .route("/:id/cancel", post(cancel_transfer))
}

#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = CreateTransferInput,
    responses(
        (status = 201, description = "Transfer created"),
        (status = 409, description = "Source request is not approved")
    ),
    tag = "transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(input): Json<CreateTransferInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let transfer = state.services.transfers.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(transfer))))
}

#[utoipa::path(
    get,
    path = "/api/v1/transfers",
    params(TransferQuery),
    responses((status = 200, description = "Transfers matching the filter")),
    tag = "transfers"
)]
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<TransferQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let transfers = state
        .services
        .transfers
        .list(TransferFilter {
            status: query.status,
            to_branch: query.to_branch,
            from_warehouse: query.from_warehouse,
            request_id: query.request_id,
            limit: query.limit,
        })
        .await?;
    Ok(Json(ApiResponse::success(transfers)))
}

#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}",
    params(("id" = String, Path, description = "Transfer id or request number")),
    responses(
        (status = 200, description = "Transfer"),
        (status = 404, description = "Unknown transfer")
    ),
    tag = "transfers"
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let transfer = state.services.transfers.get(&id).await?;
    Ok(Json(ApiResponse::success(transfer)))
}

#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/dispatch",
    request_body = DispatchBody,
    responses(
        (status = 200, description = "Transfer dispatched; idempotent on re-dispatch"),
        (status = 409, description = "Transfer not dispatchable from its current status"),
        (status = 422, description = "Insufficient stock; nothing was debited")
    ),
    tag = "transfers"
)]
pub async fn dispatch_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DispatchBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = body
        .dispatched_by
        .unwrap_or_else(|| "Warehouse Team".to_string());
    let outcome = state
        .services
        .transfers
        .dispatch(
            &id,
            &actor,
            DispatchMeta {
                dispatch_notes: body.dispatch_notes,
                expected_arrival: body.expected_arrival,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/deliver",
    request_body = ActorBody,
    responses((status = 200, description = "Delivery timestamp recorded")),
    tag = "transfers"
)]
pub async fn deliver_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = body.actor.unwrap_or_else(|| "Courier".to_string());
    let transfer = state.services.transfers.deliver(&id, &actor).await?;
    Ok(Json(ApiResponse::success(transfer)))
}

#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/receive",
    request_body = ActorBody,
    responses(
        (status = 200, description = "Receipt recorded; destination credited exactly once"),
        (status = 409, description = "Transfer not receivable from its current status")
    ),
    tag = "transfers"
)]
pub async fn receive_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = body.actor.unwrap_or_else(|| "Branch".to_string());
    let transfer = state.services.transfers.receive(&id, &actor).await?;
    Ok(Json(ApiResponse::success(transfer)))
}

#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/cancel",
    request_body = ActorBody,
    responses(
        (status = 200, description = "Transfer cancelled"),
        (status = 409, description = "Only pending transfers can be cancelled")
    ),
    tag = "transfers"
)]
pub async fn cancel_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = body.actor.unwrap_or_else(|| "System".to_string());
    let transfer = state
        .services
        .transfers
        .cancel(&id, &actor, body.reason.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(transfer)))
}

#[utoipa::path(
    get,
    path = "/api/v1/transfers/dispatch-notes",
    params(DispatchNoteQuery),
    responses((status = 200, description = "Dispatch notes matching the filter")),
    tag = "transfers"
)]
pub async fn list_dispatch_notes(
    State(state): State<AppState>,
    Query(query): Query<DispatchNoteQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let notes = state
        .services
        .transfers
        .list_dispatch_notes(DispatchNoteFilter {
            transfer_id: query.transfer_id,
            barcode: query.barcode,
            status: query.status,
            to_branch: query.to_branch,
            from_warehouse: query.from_warehouse,
        })
        .await?;
    Ok(Json(ApiResponse::success(notes)))
}
