//! Transfer and dispatch protocol.
//!
//! An approved stock request materializes a transfer. Dispatch is
//! all-or-nothing: every item line is FEFO-planned against the source
//! warehouse and the whole operation aborts with no partial debit if any
//! single line cannot be fully satisfied. The dispatch note created at
//! dispatch time records the batch allocation actually used, which is what
//! recall traceability relies on later.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::common::{
    new_entity_id, normalize_items, prepend_capped, random_suffix, to_base36, HistoryEntry,
    StockItem, StockItemInput,
};
use crate::entities::dispatch_note::{self, DispatchNoteStatus, Entity as DispatchNote};
use crate::entities::stock_request::{self, Entity as StockRequest, RequestStatus};
use crate::entities::stock_transfer::{self, Entity as StockTransfer, TransferStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::batches::{apply_allocation, plan_fefo, BatchAllocation};
use crate::services::inventory::{apply_stock_action, StockAction};

/// History entries kept per transfer.
const TRANSFER_HISTORY_CAP: usize = 50;
/// Attempts before an optimistic-lock failure is surfaced.
const CAS_MAX_ATTEMPTS: u32 = 3;

/// One dispatched line with the batch allocation behind it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchedItem {
    pub product_id: String,
    pub description: String,
    pub quantity: i32,
    pub unit: String,
    pub batches: Vec<BatchAllocation>,
}

/// Payload for creating a transfer, either from an approved request or
/// ad-hoc.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateTransferInput {
    pub request_id: Option<String>,
    pub from_warehouse: Option<String>,
    pub to_branch: Option<String>,
    #[serde(default)]
    pub items: Vec<StockItemInput>,
    pub dispatch_notes: Option<String>,
    pub created_by: Option<String>,
}

/// Optional dispatch metadata carried onto the note.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DispatchMeta {
    pub dispatch_notes: Option<String>,
    pub expected_arrival: Option<DateTime<Utc>>,
}

/// Filter for the transfer list query surface.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TransferFilter {
    pub status: Option<String>,
    pub to_branch: Option<String>,
    pub from_warehouse: Option<String>,
    pub request_id: Option<String>,
    pub limit: Option<u64>,
}

/// Filter for dispatch note lookups.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DispatchNoteFilter {
    pub transfer_id: Option<String>,
    pub barcode: Option<String>,
    pub status: Option<String>,
    pub to_branch: Option<String>,
    pub from_warehouse: Option<String>,
}

/// Outcome of a dispatch: the updated transfer plus its note.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub transfer: stock_transfer::Model,
    pub dispatch_note: dispatch_note::Model,
}

fn generate_dispatch_barcode(reference: &str) -> String {
    let raw = format!(
        "DN-{}-{}-{}",
        reference,
        to_base36(Utc::now().timestamp_millis() as u128),
        random_suffix(4)
    )
    .to_uppercase();
    raw.chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

fn history_json(action: &str, actor: &str, status: Option<&str>) -> serde_json::Value {
    serde_json::to_value(HistoryEntry {
        action: action.to_string(),
        actor: actor.to_string(),
        role: None,
        timestamp: Utc::now(),
        status: status.map(str::to_string),
        notes: None,
    })
    .expect("history entry serializes")
}

/// Service for warehouse-to-branch transfers and dispatch notes
#[derive(Clone)]
pub struct TransferService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    default_warehouse: String,
}

impl TransferService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        default_warehouse: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            default_warehouse,
        }
    }

    /// Creates a transfer. When spawned from a request the request must be
    /// approved, and items default to the request's items.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateTransferInput,
    ) -> Result<stock_transfer::Model, ServiceError> {
        let now = Utc::now();
        let created_by = input.created_by.unwrap_or_else(|| "Warehouse".to_string());

        let (request, request_number) = match &input.request_id {
            Some(request_id) => {
                let request = StockRequest::find()
                    .filter(
                        stock_request::Column::Id
                            .eq(request_id.clone())
                            .or(stock_request::Column::RequestNumber.eq(request_id.clone())),
                    )
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Request {} not found", request_id))
                    })?;
                if RequestStatus::from_str(&request.status) != Some(RequestStatus::Approved) {
                    return Err(ServiceError::InvalidTransition(format!(
                        "Request {} is {}, only approved requests spawn transfers",
                        request.id, request.status
                    )));
                }
                let number = request.request_number.clone();
                (Some(request), Some(number))
            }
            None => (None, None),
        };

        let to_branch = input
            .to_branch
            .clone()
            .or_else(|| request.as_ref().map(|r| r.requesting_branch.clone()))
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| ServiceError::ValidationError("to_branch is required".to_string()))?;

        let items: Vec<StockItem> = {
            let normalized = normalize_items(&input.items);
            if !normalized.is_empty() {
                normalized
            } else if let Some(request) = &request {
                serde_json::from_value(request.items.clone())
                    .map_err(|e| ServiceError::InternalError(format!("Malformed items: {}", e)))?
            } else {
                Vec::new()
            }
        };
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "transfer must contain at least one item with a positive quantity".to_string(),
            ));
        }

        let model = stock_transfer::ActiveModel {
            id: Set(new_entity_id("TRF")),
            request_id: Set(request.as_ref().map(|r| r.id.clone())),
            request_number: Set(request_number),
            from_warehouse: Set(input
                .from_warehouse
                .clone()
                .filter(|w| !w.trim().is_empty())
                .unwrap_or_else(|| self.default_warehouse.clone())),
            to_branch: Set(to_branch),
            status: Set(TransferStatus::Pending.as_str().to_string()),
            items: Set(serde_json::to_value(&items)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?),
            dispatch_notes: Set(input.dispatch_notes),
            created_by: Set(created_by.clone()),
            dispatched_by: Set(None),
            dispatched_at: Set(None),
            delivered_by: Set(None),
            delivered_at: Set(None),
            received_by: Set(None),
            received_at: Set(None),
            cancelled_by: Set(None),
            cancelled_at: Set(None),
            cancel_reason: Set(None),
            history: Set(serde_json::Value::Array(vec![history_json(
                "created",
                &created_by,
                Some(TransferStatus::Pending.as_str()),
            )])),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let transfer = model.insert(&*self.db).await?;
        info!(transfer_id = %transfer.id, to_branch = %transfer.to_branch, "Created stock transfer");

        self.event_sender
            .publish(Event::TransferCreated {
                transfer_id: transfer.id.clone(),
                request_id: transfer.request_id.clone(),
            })
            .await;
        Ok(transfer)
    }

    /// Dispatches a pending transfer: all-or-nothing FEFO debit of the
    /// source warehouse plus creation of the barcoded dispatch note.
    ///
    /// Re-dispatching an already-dispatched transfer is idempotent: the
    /// existing note is returned (refreshed with any new metadata) and no
    /// second debit occurs.
    #[instrument(skip(self, meta))]
    pub async fn dispatch(
        &self,
        id: &str,
        actor: &str,
        meta: DispatchMeta,
    ) -> Result<DispatchOutcome, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_dispatch(id, actor, &meta).await {
                Err(e) if e.is_retryable() && attempt < CAS_MAX_ATTEMPTS => continue,
                other => return other,
            }
        }
    }

    async fn try_dispatch(
        &self,
        id: &str,
        actor: &str,
        meta: &DispatchMeta,
    ) -> Result<DispatchOutcome, ServiceError> {
        let txn = self.db.begin().await?;
        let transfer = self.find_in(&txn, id).await?;

        match TransferStatus::from_str(&transfer.status) {
            Some(TransferStatus::Pending) => {}
            Some(TransferStatus::Dispatched) => {
                // Already debited; refresh the existing note instead of
                // creating a duplicate.
                let note = DispatchNote::find()
                    .filter(dispatch_note::Column::TransferId.eq(transfer.id.clone()))
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "Dispatched transfer {} has no dispatch note",
                            transfer.id
                        ))
                    })?;
                let mut active: dispatch_note::ActiveModel = note.into();
                if let Some(expected) = meta.expected_arrival {
                    active.expected_arrival = Set(Some(expected));
                }
                active.updated_at = Set(Utc::now());
                let note = active.update(&txn).await?;
                txn.commit().await?;
                return Ok(DispatchOutcome {
                    transfer,
                    dispatch_note: note,
                });
            }
            Some(other) => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Cannot dispatch transfer {} from status '{}'",
                    transfer.id,
                    other.as_str()
                )));
            }
            None => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Transfer {} is in unknown status '{}'",
                    transfer.id, transfer.status
                )));
            }
        }

        let items: Vec<StockItem> = serde_json::from_value(transfer.items.clone())
            .map_err(|e| ServiceError::InternalError(format!("Malformed items: {}", e)))?;

        let reference = transfer
            .request_number
            .clone()
            .unwrap_or_else(|| transfer.id.clone());

        // Plan and debit every line before anything is committed; the first
        // shortfall aborts the whole dispatch with no partial debit.
        let mut dispatched_items = Vec::with_capacity(items.len());
        let mut adjustments = Vec::with_capacity(items.len());
        let mut exhausted_batches = Vec::new();
        for item in &items {
            let candidates = crate::entities::stock_batch::Entity::find()
                .filter(
                    crate::entities::stock_batch::Column::Location
                        .eq(transfer.from_warehouse.clone()),
                )
                .filter(crate::entities::stock_batch::Column::ProductId.eq(item.product_id.clone()))
                .filter(crate::entities::stock_batch::Column::RemainingQuantity.gt(0))
                .all(&txn)
                .await?;

            let plan = plan_fefo(&candidates, item.quantity);
            if !plan.is_complete() {
                return Err(ServiceError::InsufficientStock(format!(
                    "{} short by {} at {} for transfer {}",
                    item.product_id, plan.shortfall, transfer.from_warehouse, transfer.id
                )));
            }

            apply_allocation(&txn, &plan).await?;
            exhausted_batches.extend(
                plan.lines
                    .iter()
                    .filter(|l| l.remaining_before == l.take)
                    .map(|l| (l.batch_id.clone(), l.barcode.clone())),
            );

            let record = apply_stock_action(
                &txn,
                &transfer.from_warehouse,
                &item.product_id,
                item.quantity,
                StockAction::Out,
                Some("transfer-out"),
                Some(&reference),
            )
            .await?;
            adjustments.push((item.product_id.clone(), item.quantity, record));

            dispatched_items.push(DispatchedItem {
                product_id: item.product_id.clone(),
                description: item.description.clone(),
                quantity: item.quantity,
                unit: item.unit.clone(),
                batches: plan.lines,
            });
        }

        let now = Utc::now();
        let note_model = dispatch_note::ActiveModel {
            id: Set(new_entity_id("NOTE").to_uppercase()),
            transfer_id: Set(transfer.id.clone()),
            request_id: Set(transfer.request_id.clone()),
            request_number: Set(transfer.request_number.clone()),
            barcode: Set(generate_dispatch_barcode(&reference)),
            from_warehouse: Set(transfer.from_warehouse.clone()),
            to_branch: Set(transfer.to_branch.clone()),
            items: Set(serde_json::to_value(&dispatched_items)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?),
            status: Set(DispatchNoteStatus::InTransit.as_str().to_string()),
            expected_arrival: Set(meta.expected_arrival),
            dispatched_by: Set(actor.to_string()),
            dispatched_at: Set(now),
            received_by: Set(None),
            received_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let note = note_model.insert(&txn).await?;

        let mut history = transfer.history.clone();
        prepend_capped(
            &mut history,
            history_json("status:dispatched", actor, None),
            TRANSFER_HISTORY_CAP,
        );

        let mut update = StockTransfer::update_many()
            .col_expr(
                stock_transfer::Column::Status,
                Expr::value(TransferStatus::Dispatched.as_str()),
            )
            .col_expr(stock_transfer::Column::DispatchedBy, Expr::value(actor))
            .col_expr(stock_transfer::Column::DispatchedAt, Expr::value(now))
            .col_expr(stock_transfer::Column::History, Expr::value(history))
            .col_expr(
                stock_transfer::Column::Version,
                Expr::value(transfer.version + 1),
            )
            .col_expr(stock_transfer::Column::UpdatedAt, Expr::value(now));
        if let Some(notes) = &meta.dispatch_notes {
            update = update.col_expr(
                stock_transfer::Column::DispatchNotes,
                Expr::value(notes.clone()),
            );
        }
        let result = update
            .filter(stock_transfer::Column::Id.eq(transfer.id.clone()))
            .filter(stock_transfer::Column::Version.eq(transfer.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrencyConflict(format!(
                "Transfer {} changed while dispatching",
                transfer.id
            )));
        }

        txn.commit().await?;

        info!(
            transfer_id = %transfer.id,
            barcode = %note.barcode,
            items = dispatched_items.len(),
            "Dispatched transfer"
        );
        for (product_id, debited, record) in adjustments {
            self.event_sender
                .publish(Event::InventoryAdjusted {
                    location: transfer.from_warehouse.clone(),
                    product_id,
                    old_quantity: record.quantity + debited,
                    new_quantity: record.quantity,
                    reason: "transfer-out".to_string(),
                })
                .await;
        }
        for (batch_id, barcode) in exhausted_batches {
            self.event_sender
                .publish(Event::BatchExhausted { batch_id, barcode })
                .await;
        }
        self.event_sender
            .publish(Event::TransferDispatched {
                transfer_id: transfer.id.clone(),
                dispatch_note_id: note.id.clone(),
                barcode: note.barcode.clone(),
            })
            .await;

        let transfer = self.get(&transfer.id).await?;
        Ok(DispatchOutcome {
            transfer,
            dispatch_note: note,
        })
    }

    /// Marks a dispatched transfer as delivered. Advisory only: no
    /// inventory effect. Idempotent on already-delivered transfers.
    #[instrument(skip(self))]
    pub async fn deliver(
        &self,
        id: &str,
        actor: &str,
    ) -> Result<stock_transfer::Model, ServiceError> {
        let transfer = self.find_in(&*self.db, id).await?;
        match TransferStatus::from_str(&transfer.status) {
            Some(TransferStatus::Dispatched) => {}
            Some(TransferStatus::Delivered) => return Ok(transfer),
            _ => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Cannot mark transfer {} delivered from status '{}'",
                    transfer.id, transfer.status
                )));
            }
        }

        let now = Utc::now();
        let mut history = transfer.history.clone();
        prepend_capped(
            &mut history,
            history_json("status:delivered", actor, None),
            TRANSFER_HISTORY_CAP,
        );

        let mut active: stock_transfer::ActiveModel = transfer.clone().into();
        active.status = Set(TransferStatus::Delivered.as_str().to_string());
        active.delivered_by = Set(Some(actor.to_string()));
        active.delivered_at = Set(Some(now));
        active.history = Set(history);
        active.version = Set(transfer.version + 1);
        active.updated_at = Set(now);
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .publish(Event::TransferDelivered {
                transfer_id: updated.id.clone(),
            })
            .await;
        Ok(updated)
    }

    /// Confirms receipt at the destination branch: credits branch inventory
    /// by the dispatched quantities and closes the dispatch note.
    ///
    /// Re-invoking receive on an already-received transfer is a no-op; the
    /// destination is credited exactly once.
    #[instrument(skip(self))]
    pub async fn receive(
        &self,
        id: &str,
        actor: &str,
    ) -> Result<stock_transfer::Model, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_receive(id, actor).await {
                Err(e) if e.is_retryable() && attempt < CAS_MAX_ATTEMPTS => continue,
                other => return other,
            }
        }
    }

    async fn try_receive(
        &self,
        id: &str,
        actor: &str,
    ) -> Result<stock_transfer::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let transfer = self.find_in(&txn, id).await?;

        match TransferStatus::from_str(&transfer.status) {
            Some(TransferStatus::Dispatched) | Some(TransferStatus::Delivered) => {}
            Some(TransferStatus::Received) => return Ok(transfer),
            _ => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Cannot receive transfer {} from status '{}'",
                    transfer.id, transfer.status
                )));
            }
        }

        // The branch receives exactly what was dispatched; FEFO is not
        // re-run here.
        let items: Vec<StockItem> = serde_json::from_value(transfer.items.clone())
            .map_err(|e| ServiceError::InternalError(format!("Malformed items: {}", e)))?;
        let reference = transfer
            .request_number
            .clone()
            .unwrap_or_else(|| transfer.id.clone());
        for item in &items {
            apply_stock_action(
                &txn,
                &transfer.to_branch,
                &item.product_id,
                item.quantity,
                StockAction::In,
                Some("transfer-in"),
                Some(&reference),
            )
            .await?;
        }

        let now = Utc::now();
        let note = DispatchNote::find()
            .filter(dispatch_note::Column::TransferId.eq(transfer.id.clone()))
            .one(&txn)
            .await?;
        let note_id = note.as_ref().map(|n| n.id.clone());
        if let Some(note) = note {
            let mut active: dispatch_note::ActiveModel = note.into();
            active.status = Set(DispatchNoteStatus::Received.as_str().to_string());
            active.received_by = Set(Some(actor.to_string()));
            active.received_at = Set(Some(now));
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        let mut history = transfer.history.clone();
        prepend_capped(
            &mut history,
            history_json("status:received", actor, None),
            TRANSFER_HISTORY_CAP,
        );

        let result = StockTransfer::update_many()
            .col_expr(
                stock_transfer::Column::Status,
                Expr::value(TransferStatus::Received.as_str()),
            )
            .col_expr(stock_transfer::Column::ReceivedBy, Expr::value(actor))
            .col_expr(stock_transfer::Column::ReceivedAt, Expr::value(now))
            .col_expr(stock_transfer::Column::History, Expr::value(history))
            .col_expr(
                stock_transfer::Column::Version,
                Expr::value(transfer.version + 1),
            )
            .col_expr(stock_transfer::Column::UpdatedAt, Expr::value(now))
            .filter(stock_transfer::Column::Id.eq(transfer.id.clone()))
            .filter(stock_transfer::Column::Version.eq(transfer.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrencyConflict(format!(
                "Transfer {} changed while receiving",
                transfer.id
            )));
        }

        txn.commit().await?;

        info!(transfer_id = %transfer.id, to_branch = %transfer.to_branch, "Received transfer");
        if let Some(note_id) = note_id {
            self.event_sender
                .publish(Event::DispatchNoteReceived {
                    note_id,
                    transfer_id: transfer.id.clone(),
                })
                .await;
        }
        self.event_sender
            .publish(Event::TransferReceived {
                transfer_id: transfer.id.clone(),
            })
            .await;

        self.get(&transfer.id).await
    }

    /// Cancels a pending transfer. Terminal; no inventory effect because
    /// nothing has been debited yet. Idempotent on cancelled transfers.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        id: &str,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<stock_transfer::Model, ServiceError> {
        let transfer = self.find_in(&*self.db, id).await?;
        match TransferStatus::from_str(&transfer.status) {
            Some(TransferStatus::Pending) => {}
            Some(TransferStatus::Cancelled) => return Ok(transfer),
            _ => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Only pending transfers can be cancelled; {} is '{}'",
                    transfer.id, transfer.status
                )));
            }
        }

        let now = Utc::now();
        let mut history = transfer.history.clone();
        prepend_capped(
            &mut history,
            history_json("status:cancelled", actor, None),
            TRANSFER_HISTORY_CAP,
        );

        let mut active: stock_transfer::ActiveModel = transfer.clone().into();
        active.status = Set(TransferStatus::Cancelled.as_str().to_string());
        active.cancelled_by = Set(Some(actor.to_string()));
        active.cancelled_at = Set(Some(now));
        active.cancel_reason = Set(reason.map(str::to_string));
        active.history = Set(history);
        active.version = Set(transfer.version + 1);
        active.updated_at = Set(now);
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .publish(Event::TransferCancelled {
                transfer_id: updated.id.clone(),
            })
            .await;
        Ok(updated)
    }

    /// Fetches one transfer by id or request number.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<stock_transfer::Model, ServiceError> {
        self.find_in(&*self.db, id).await
    }

    async fn find_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> Result<stock_transfer::Model, ServiceError> {
        StockTransfer::find()
            .filter(
                stock_transfer::Column::Id
                    .eq(id)
                    .or(stock_transfer::Column::RequestNumber.eq(id)),
            )
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", id)))
    }

    /// Lists transfers newest first with optional filters.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: TransferFilter,
    ) -> Result<Vec<stock_transfer::Model>, ServiceError> {
        let mut query = StockTransfer::find();
        if let Some(status) = filter.status.filter(|s| s != "all") {
            query = query.filter(stock_transfer::Column::Status.eq(status));
        }
        if let Some(to_branch) = filter.to_branch.filter(|b| b != "all") {
            query = query.filter(stock_transfer::Column::ToBranch.eq(to_branch));
        }
        if let Some(from_warehouse) = filter.from_warehouse.filter(|w| w != "all") {
            query = query.filter(stock_transfer::Column::FromWarehouse.eq(from_warehouse));
        }
        if let Some(request_id) = filter.request_id {
            query = query.filter(stock_transfer::Column::RequestId.eq(request_id));
        }
        query = query.order_by_desc(stock_transfer::Column::CreatedAt);
        query = query.limit(filter.limit.unwrap_or(200).min(1000));
        Ok(query.all(&*self.db).await?)
    }

    /// Looks up dispatch notes for reporting and receipt scanning.
    #[instrument(skip(self))]
    pub async fn list_dispatch_notes(
        &self,
        filter: DispatchNoteFilter,
    ) -> Result<Vec<dispatch_note::Model>, ServiceError> {
        let mut query = DispatchNote::find();
        if let Some(transfer_id) = filter.transfer_id {
            query = query.filter(dispatch_note::Column::TransferId.eq(transfer_id));
        }
        if let Some(barcode) = filter.barcode {
            query = query.filter(dispatch_note::Column::Barcode.eq(barcode));
        }
        if let Some(status) = filter.status.filter(|s| s != "all") {
            query = query.filter(dispatch_note::Column::Status.eq(status));
        }
        if let Some(to_branch) = filter.to_branch.filter(|b| b != "all") {
            query = query.filter(dispatch_note::Column::ToBranch.eq(to_branch));
        }
        if let Some(from_warehouse) = filter.from_warehouse.filter(|w| w != "all") {
            query = query.filter(dispatch_note::Column::FromWarehouse.eq(from_warehouse));
        }
        query = query.order_by_desc(dispatch_note::Column::CreatedAt);
        Ok(query.all(&*self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_barcodes_are_uppercase_and_restricted() {
        let barcode = generate_dispatch_barcode("SRQ-townshop-20250101-ab1cd");
        assert!(barcode.starts_with("DN-SRQ-TOWNSHOP-"));
        assert!(barcode
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn dispatch_barcodes_strip_invalid_characters() {
        let barcode = generate_dispatch_barcode("trf_1 & співробітник");
        assert!(barcode.starts_with("DN-"));
        assert!(!barcode.contains('_'));
        assert!(!barcode.contains(' '));
        assert!(barcode
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'));
    }
}
