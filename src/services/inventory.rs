//! Inventory Ledger
//!
//! Sole authority for per-location, per-product quantities. Every stock
//! delta in the system flows through `apply_stock_action`, which performs a
//! compare-and-swap on the record's version column so that concurrent
//! writers cannot race past an availability check. Service-level wrappers
//! retry a bounded number of times before surfacing `ConcurrencyConflict`.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::common::MovementEntry;
use crate::entities::inventory_record::{self, Entity as InventoryRecord};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Movement history entries kept per (location, product) record.
const MOVEMENT_HISTORY_CAP: usize = 100;
/// Attempts before an optimistic-lock failure is surfaced to the caller.
const CAS_MAX_ATTEMPTS: u32 = 3;

/// Ledger actions, mirroring the warehouse stock verbs used by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    /// Credit stock into the location.
    In,
    /// Debit stock out of the location.
    Out,
    /// Earmark available stock for a pending operation.
    Reserve,
    /// Return earmarked stock to the available pool.
    Unreserve,
}

impl StockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockAction::In => "in",
            StockAction::Out => "out",
            StockAction::Reserve => "reserve",
            StockAction::Unreserve => "unreserve",
        }
    }
}

/// Read-only projection of one product at a location.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnapshotEntry {
    pub product_id: String,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub available_quantity: i32,
    pub reorder_level: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<inventory_record::Model> for SnapshotEntry {
    fn from(model: inventory_record::Model) -> Self {
        Self {
            product_id: model.product_id.clone(),
            quantity: model.quantity,
            reserved_quantity: model.reserved_quantity,
            available_quantity: model.available_quantity(),
            reorder_level: model.reorder_level,
            updated_at: model.updated_at,
        }
    }
}

/// Applies one ledger action atomically on the given connection.
///
/// Single-attempt: a version mismatch (another writer got there first)
/// returns `ConcurrencyConflict` and leaves no partial write. Callers
/// running inside a larger transaction propagate the conflict so the whole
/// unit rolls back; standalone callers retry via the service wrappers.
pub(crate) async fn apply_stock_action<C: ConnectionTrait>(
    conn: &C,
    location: &str,
    product_id: &str,
    qty: i32,
    action: StockAction,
    reason: Option<&str>,
    reference: Option<&str>,
) -> Result<inventory_record::Model, ServiceError> {
    if location.trim().is_empty() || product_id.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "location and product_id are required".to_string(),
        ));
    }
    if qty <= 0 {
        return Err(ServiceError::ValidationError(
            "quantity must be a positive integer".to_string(),
        ));
    }

    let now = Utc::now();
    let existing = InventoryRecord::find()
        .filter(inventory_record::Column::Location.eq(location))
        .filter(inventory_record::Column::ProductId.eq(product_id))
        .one(conn)
        .await?;

    let record = match existing {
        Some(record) => record,
        None => {
            // First touch of this (location, product). Only a credit may
            // create the record; everything else has nothing to act on.
            if action != StockAction::In {
                return Err(match action {
                    StockAction::Out => ServiceError::InsufficientStock(format!(
                        "No stock of {} at {}",
                        product_id, location
                    )),
                    StockAction::Reserve => ServiceError::InsufficientAvailable(format!(
                        "No stock of {} at {}",
                        product_id, location
                    )),
                    _ => ServiceError::ValidationError(format!(
                        "No reservation of {} at {} to release",
                        product_id, location
                    )),
                });
            }
            let movement = movement_json(action, qty, qty, reason, reference, now);
            let model = inventory_record::ActiveModel {
                location: Set(location.to_string()),
                product_id: Set(product_id.to_string()),
                quantity: Set(qty),
                reserved_quantity: Set(0),
                reorder_level: Set(10),
                history: Set(serde_json::Value::Array(vec![movement])),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            return match model.insert(conn).await {
                Ok(created) => Ok(created),
                // A concurrent first-credit hit the unique (location, product)
                // index; the caller retries and lands on the update path.
                Err(e) => Err(ServiceError::ConcurrencyConflict(format!(
                    "Concurrent creation of {} at {}: {}",
                    product_id, location, e
                ))),
            };
        }
    };

    let (new_quantity, new_reserved) = match action {
        StockAction::In => (record.quantity + qty, record.reserved_quantity),
        StockAction::Out => {
            let remaining = record.quantity - qty;
            if remaining < 0 || remaining < record.reserved_quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Cannot debit {} of {} at {}: {} on hand, {} reserved",
                    qty, product_id, location, record.quantity, record.reserved_quantity
                )));
            }
            (remaining, record.reserved_quantity)
        }
        StockAction::Reserve => {
            if record.available_quantity() < qty {
                return Err(ServiceError::InsufficientAvailable(format!(
                    "Cannot reserve {} of {} at {}: only {} available",
                    qty,
                    product_id,
                    location,
                    record.available_quantity()
                )));
            }
            (record.quantity, record.reserved_quantity + qty)
        }
        StockAction::Unreserve => {
            if qty > record.reserved_quantity {
                return Err(ServiceError::ValidationError(format!(
                    "Cannot release {} of {} at {}: only {} reserved",
                    qty, product_id, location, record.reserved_quantity
                )));
            }
            (record.quantity, record.reserved_quantity - qty)
        }
    };

    let mut history = record.history.clone();
    crate::common::prepend_capped(
        &mut history,
        movement_json(action, qty, new_quantity - new_reserved, reason, reference, now),
        MOVEMENT_HISTORY_CAP,
    );

    let result = InventoryRecord::update_many()
        .col_expr(inventory_record::Column::Quantity, Expr::value(new_quantity))
        .col_expr(
            inventory_record::Column::ReservedQuantity,
            Expr::value(new_reserved),
        )
        .col_expr(inventory_record::Column::History, Expr::value(history.clone()))
        .col_expr(
            inventory_record::Column::Version,
            Expr::value(record.version + 1),
        )
        .col_expr(inventory_record::Column::UpdatedAt, Expr::value(now))
        .filter(inventory_record::Column::Id.eq(record.id))
        .filter(inventory_record::Column::Version.eq(record.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrencyConflict(format!(
            "Version conflict updating {} at {}",
            product_id, location
        )));
    }

    Ok(inventory_record::Model {
        quantity: new_quantity,
        reserved_quantity: new_reserved,
        history,
        version: record.version + 1,
        updated_at: now,
        ..record
    })
}

fn movement_json(
    action: StockAction,
    qty: i32,
    available_after: i32,
    reason: Option<&str>,
    reference: Option<&str>,
    timestamp: DateTime<Utc>,
) -> serde_json::Value {
    serde_json::to_value(MovementEntry {
        action: action.as_str().to_string(),
        quantity: qty,
        available_quantity: available_after,
        reason: reason.map(str::to_string),
        reference: reference.map(str::to_string),
        timestamp,
    })
    .expect("movement entry serializes")
}

/// Service for the warehouse and branch inventory ledger
#[derive(Clone)]
pub struct InventoryLedgerService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InventoryLedgerService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    async fn with_retry(
        &self,
        location: &str,
        product_id: &str,
        qty: i32,
        action: StockAction,
        reason: Option<&str>,
        reference: Option<&str>,
    ) -> Result<inventory_record::Model, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match apply_stock_action(
                &*self.db, location, product_id, qty, action, reason, reference,
            )
            .await
            {
                Err(e) if e.is_retryable() && attempt < CAS_MAX_ATTEMPTS => continue,
                other => return other,
            }
        }
    }

    /// Atomically applies a signed delta to the on-hand quantity.
    ///
    /// A negative delta that would push quantity below zero (or into the
    /// reserved pool) fails with `InsufficientStock`; nothing is clamped.
    #[instrument(skip(self))]
    pub async fn adjust(
        &self,
        location: &str,
        product_id: &str,
        delta: i32,
        reason: &str,
        reference: Option<&str>,
    ) -> Result<inventory_record::Model, ServiceError> {
        if delta == 0 {
            return Err(ServiceError::ValidationError(
                "delta must be non-zero".to_string(),
            ));
        }
        let action = if delta > 0 {
            StockAction::In
        } else {
            StockAction::Out
        };
        let before = self.quantity_on_hand(location, product_id).await?;
        let record = self
            .with_retry(
                location,
                product_id,
                delta.abs(),
                action,
                Some(reason),
                reference,
            )
            .await?;

        info!(
            location,
            product_id,
            delta,
            new_quantity = record.quantity,
            "Adjusted inventory"
        );
        self.event_sender
            .publish(Event::InventoryAdjusted {
                location: location.to_string(),
                product_id: product_id.to_string(),
                old_quantity: before,
                new_quantity: record.quantity,
                reason: reason.to_string(),
            })
            .await;
        Ok(record)
    }

    /// Earmarks available stock ahead of dispatch without moving it.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        location: &str,
        product_id: &str,
        qty: i32,
        reference: Option<&str>,
    ) -> Result<inventory_record::Model, ServiceError> {
        let record = self
            .with_retry(location, product_id, qty, StockAction::Reserve, None, reference)
            .await?;
        self.event_sender
            .publish(Event::InventoryReserved {
                location: location.to_string(),
                product_id: product_id.to_string(),
                quantity: qty,
            })
            .await;
        Ok(record)
    }

    /// Returns earmarked stock to the available pool.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        location: &str,
        product_id: &str,
        qty: i32,
        reference: Option<&str>,
    ) -> Result<inventory_record::Model, ServiceError> {
        let record = self
            .with_retry(
                location,
                product_id,
                qty,
                StockAction::Unreserve,
                None,
                reference,
            )
            .await?;
        self.event_sender
            .publish(Event::InventoryReleased {
                location: location.to_string(),
                product_id: product_id.to_string(),
                quantity: qty,
            })
            .await;
        Ok(record)
    }

    /// Read-only projection of every product at a location.
    #[instrument(skip(self))]
    pub async fn snapshot(&self, location: &str) -> Result<Vec<SnapshotEntry>, ServiceError> {
        let records = InventoryRecord::find()
            .filter(inventory_record::Column::Location.eq(location))
            .order_by_asc(inventory_record::Column::ProductId)
            .all(&*self.db)
            .await?;
        Ok(records.into_iter().map(SnapshotEntry::from).collect())
    }

    /// Records at or below their reorder threshold, optionally per location.
    #[instrument(skip(self))]
    pub async fn low_stock(
        &self,
        location: Option<&str>,
    ) -> Result<Vec<inventory_record::Model>, ServiceError> {
        let mut query = InventoryRecord::find();
        if let Some(location) = location {
            query = query.filter(inventory_record::Column::Location.eq(location));
        }
        let records = query.all(&*self.db).await?;
        Ok(records.into_iter().filter(|r| r.is_low_stock()).collect())
    }

    /// Sets the reorder threshold for one record.
    #[instrument(skip(self))]
    pub async fn set_reorder_level(
        &self,
        location: &str,
        product_id: &str,
        reorder_level: i32,
    ) -> Result<inventory_record::Model, ServiceError> {
        if reorder_level < 0 {
            return Err(ServiceError::ValidationError(
                "reorder_level must be non-negative".to_string(),
            ));
        }
        let record = InventoryRecord::find()
            .filter(inventory_record::Column::Location.eq(location))
            .filter(inventory_record::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No record of {} at {}", product_id, location))
            })?;

        let mut active: inventory_record::ActiveModel = record.into();
        active.reorder_level = Set(reorder_level);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    async fn quantity_on_hand(
        &self,
        location: &str,
        product_id: &str,
    ) -> Result<i32, ServiceError> {
        let record = InventoryRecord::find()
            .filter(inventory_record::Column::Location.eq(location))
            .filter(inventory_record::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;
        Ok(record.map(|r| r.quantity).unwrap_or(0))
    }
}
