//! OpenAPI documentation for the HTTP surface.

use utoipa::OpenApi;

use crate::common::{ApprovalEntry, HistoryEntry, MovementEntry, StockItem, StockItemInput};
use crate::errors::ErrorResponse;
use crate::handlers;
use crate::services::batches::{AllocationPlan, BatchAllocation, BatchImportInput, BatchStatistics};
use crate::services::inventory::SnapshotEntry;
use crate::services::stock_requests::{
    CreateStockRequestInput, StockRequestFilter, UpdateStockRequestInput,
};
use crate::services::transfers::{
    CreateTransferInput, DispatchMeta, DispatchNoteFilter, DispatchedItem, TransferFilter,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PharmStock API",
        description = "Pharmaceutical stock lifecycle: requests, approvals, transfers, barcoded batch dispatch and receipt",
        license(name = "MIT")
    ),
    paths(
        handlers::health::health_check,
        handlers::stock_requests::create_stock_request,
        handlers::stock_requests::list_stock_requests,
        handlers::stock_requests::get_stock_request,
        handlers::stock_requests::update_stock_request,
        handlers::stock_requests::approve_stock_request,
        handlers::transfers::create_transfer,
        handlers::transfers::list_transfers,
        handlers::transfers::get_transfer,
        handlers::transfers::dispatch_transfer,
        handlers::transfers::deliver_transfer,
        handlers::transfers::receive_transfer,
        handlers::transfers::cancel_transfer,
        handlers::transfers::list_dispatch_notes,
        handlers::warehouse::get_snapshot,
        handlers::warehouse::get_low_stock,
        handlers::warehouse::adjust_stock,
        handlers::warehouse::reserve_stock,
        handlers::warehouse::release_stock,
        handlers::warehouse::set_reorder_level,
        handlers::batches::import_batch,
        handlers::batches::list_batches,
        handlers::batches::get_batch,
        handlers::batches::fefo_plan,
        handlers::batches::dispatch_batch,
        handlers::batches::receive_batch,
        handlers::batches::remove_batch,
        handlers::batches::expiring_batches,
        handlers::batches::batch_statistics,
    ),
    components(schemas(
        ErrorResponse,
        handlers::stock_requests::ApproveRequestBody,
        handlers::transfers::DispatchBody,
        handlers::transfers::ActorBody,
        handlers::warehouse::AdjustStockBody,
        handlers::warehouse::ReserveStockBody,
        handlers::warehouse::ReorderLevelBody,
        handlers::batches::BatchMoveBody,
        handlers::health::HealthStatus,
        StockItem,
        StockItemInput,
        ApprovalEntry,
        HistoryEntry,
        MovementEntry,
        SnapshotEntry,
        AllocationPlan,
        BatchAllocation,
        BatchImportInput,
        BatchStatistics,
        CreateStockRequestInput,
        UpdateStockRequestInput,
        StockRequestFilter,
        CreateTransferInput,
        DispatchMeta,
        DispatchedItem,
        TransferFilter,
        DispatchNoteFilter,
    )),
    tags(
        (name = "stock-requests", description = "Branch replenishment and return requests"),
        (name = "transfers", description = "Warehouse-to-branch transfers and dispatch notes"),
        (name = "warehouse", description = "Inventory ledger operations"),
        (name = "batches", description = "Barcoded batch import, dispatch and expiry reporting"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
