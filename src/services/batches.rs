//! Barcoded batch store and FEFO allocator.
//!
//! Batches are the source of truth wherever expiry matters; the inventory
//! ledger aggregate is a cached projection kept in lockstep by running every
//! batch mutation and its ledger counterpart in one transaction.
//! `plan_fefo` itself is a pure query: it never mutates state, so callers
//! must apply the returned plan via `apply_allocation` inside the same
//! logical transaction that re-checked availability.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::common::{new_entity_id, random_suffix};
use crate::entities::stock_batch::{self, BatchStatus, Entity as StockBatch};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory::{apply_stock_action, StockAction};

/// One slice of a FEFO allocation: take `take` units from this batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchAllocation {
    pub batch_id: String,
    pub barcode: String,
    pub batch_no: String,
    pub expiry: Option<NaiveDate>,
    /// Remaining quantity observed when the plan was computed; used as the
    /// compare-and-swap expectation when the plan is applied.
    pub remaining_before: i32,
    pub take: i32,
}

/// Result of planning an allocation against the batches at one location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AllocationPlan {
    pub lines: Vec<BatchAllocation>,
    /// Units that could not be covered by available batches. Zero means the
    /// requirement is fully satisfied; callers decide whether a partial
    /// plan is acceptable.
    pub shortfall: i32,
}

impl AllocationPlan {
    pub fn is_complete(&self) -> bool {
        self.shortfall == 0
    }

    pub fn allocated(&self) -> i32 {
        self.lines.iter().map(|l| l.take).sum()
    }
}

/// Selects batches first-expiring-first-out until `required` is covered.
///
/// Batches without a known expiry sort last. Exhausted batches never
/// contribute (their remaining quantity is zero). Zero required quantity
/// yields an empty, complete plan.
pub fn plan_fefo(batches: &[stock_batch::Model], required: i32) -> AllocationPlan {
    if required <= 0 {
        return AllocationPlan::default();
    }

    let mut candidates: Vec<&stock_batch::Model> = batches
        .iter()
        .filter(|b| b.remaining_quantity > 0)
        .collect();
    candidates.sort_by_key(|b| (b.expiry.is_none(), b.expiry, b.id.clone()));

    let mut remaining = required;
    let mut lines = Vec::new();
    for batch in candidates {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.remaining_quantity);
        lines.push(BatchAllocation {
            batch_id: batch.id.clone(),
            barcode: batch.barcode.clone(),
            batch_no: batch.batch_no.clone(),
            expiry: batch.expiry,
            remaining_before: batch.remaining_quantity,
            take,
        });
        remaining -= take;
    }

    AllocationPlan {
        lines,
        shortfall: remaining,
    }
}

/// Applies a FEFO plan on the given connection, decrementing each batch.
///
/// Each decrement is a compare-and-swap against the remaining quantity the
/// plan observed; any interleaved writer fails the whole unit with
/// `ConcurrencyConflict` so the surrounding transaction rolls back.
/// Returns the batches that were emptied by this application.
pub(crate) async fn apply_allocation<C: ConnectionTrait>(
    conn: &C,
    plan: &AllocationPlan,
) -> Result<Vec<String>, ServiceError> {
    let now = Utc::now();
    let mut exhausted = Vec::new();

    for line in &plan.lines {
        let remaining_after = line.remaining_before - line.take;
        let status = if remaining_after == 0 {
            BatchStatus::Exhausted
        } else {
            BatchStatus::Available
        };

        let result = StockBatch::update_many()
            .col_expr(
                stock_batch::Column::RemainingQuantity,
                Expr::value(remaining_after),
            )
            .col_expr(stock_batch::Column::Status, Expr::value(status.as_str()))
            .col_expr(stock_batch::Column::UpdatedAt, Expr::value(now))
            .filter(stock_batch::Column::Id.eq(line.batch_id.clone()))
            .filter(stock_batch::Column::RemainingQuantity.eq(line.remaining_before))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrencyConflict(format!(
                "Batch {} changed while allocating",
                line.batch_id
            )));
        }
        if remaining_after == 0 {
            exhausted.push(line.batch_id.clone());
        }
    }

    Ok(exhausted)
}

/// Normalizes the expiry formats accepted from import sheets to the first
/// day of the expiry month. Accepted: `YYYY-MM`, `YYYY/MM`, `MM-YYYY`,
/// `MM/YYYY`, and full dates (`YYYY-MM-DD`).
pub fn normalize_expiry(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return NaiveDate::from_ymd_opt(date.year(), date.month(), 1);
    }

    let parts: Vec<&str> = trimmed.split(['-', '/']).collect();
    if parts.len() == 2 {
        let (year, month) = if parts[0].len() == 4 {
            (parts[0].parse::<i32>().ok()?, parts[1].parse::<u32>().ok()?)
        } else if parts[1].len() == 4 {
            (parts[1].parse::<i32>().ok()?, parts[0].parse::<u32>().ok()?)
        } else {
            return None;
        };
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    None
}

fn generate_batch_barcode(description: &str, batch_no: &str) -> String {
    let seed: String = format!(
        "{}-{}-{}",
        description,
        batch_no,
        crate::common::to_base36(Utc::now().timestamp_millis() as u128)
    )
    .chars()
    .filter(|c| c.is_ascii_alphanumeric())
    .collect();
    format!(
        "BC-{}-{}",
        seed.to_uppercase(),
        random_suffix(6).to_uppercase()
    )
}

/// Raw import payload for one batch, as scanned or keyed in at goods-in.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BatchImportInput {
    pub description: String,
    /// Defaults to the description when the sheet carries no product code.
    pub product_id: Option<String>,
    pub batch_no: String,
    pub expiry_date: String,
    pub quantity: i32,
    pub carton_no: Option<String>,
    pub total_cartons: Option<i32>,
    pub location: Option<String>,
}

/// Summary statistics over the batch store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchStatistics {
    pub total_batches: u64,
    pub total_remaining_quantity: i64,
    pub expiring_soon: u64,
    pub expired: u64,
    pub low_stock_products: u64,
    pub computed_at: DateTime<Utc>,
}

/// Days ahead counted as "expiring soon" in statistics.
const EXPIRY_WARNING_DAYS: i64 = 60;
/// Remaining units at or below which a batch flags its product as low.
const LOW_BATCH_THRESHOLD: i32 = 20;

/// Service for barcoded batch import, dispatch, receipt and reporting
#[derive(Clone)]
pub struct BatchService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl BatchService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Imports one batch into the country/warehouse pool, crediting the
    /// ledger at the batch's location in the same transaction.
    #[instrument(skip(self, input), fields(batch_no = %input.batch_no))]
    pub async fn import_batch(
        &self,
        input: BatchImportInput,
        actor: &str,
    ) -> Result<stock_batch::Model, ServiceError> {
        for (field, value) in [
            ("description", &input.description),
            ("batch_no", &input.batch_no),
            ("expiry_date", &input.expiry_date),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::ValidationError(format!("Missing {}", field)));
            }
        }
        let expiry = normalize_expiry(&input.expiry_date)
            .ok_or_else(|| ServiceError::ValidationError("Invalid expiry format".to_string()))?;
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Invalid quantity".to_string(),
            ));
        }
        if matches!(input.total_cartons, Some(c) if c <= 0) {
            return Err(ServiceError::ValidationError(
                "Invalid total cartons".to_string(),
            ));
        }

        let description = input.description.trim().to_string();
        let product_id = input
            .product_id
            .clone()
            .unwrap_or_else(|| description.clone());
        let location = input
            .location
            .clone()
            .unwrap_or_else(|| "country_stock".to_string());
        let now = Utc::now();

        let model = stock_batch::ActiveModel {
            id: Set(new_entity_id("BATCH")),
            product_id: Set(product_id.clone()),
            description: Set(description.clone()),
            batch_no: Set(input.batch_no.trim().to_string()),
            carton_no: Set(input.carton_no.clone()),
            expiry: Set(Some(expiry)),
            quantity: Set(input.quantity),
            remaining_quantity: Set(input.quantity),
            total_cartons: Set(input.total_cartons.unwrap_or(input.quantity)),
            location: Set(location.clone()),
            status: Set(BatchStatus::Available.as_str().to_string()),
            barcode: Set(generate_batch_barcode(&description, &input.batch_no)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let txn = self.db.begin().await?;
        let batch = model.insert(&txn).await?;
        apply_stock_action(
            &txn,
            &location,
            &product_id,
            input.quantity,
            StockAction::In,
            Some("batch-import"),
            Some(&batch.barcode),
        )
        .await?;
        txn.commit().await?;

        info!(batch_id = %batch.id, barcode = %batch.barcode, "Imported stock batch");
        self.event_sender
            .publish(Event::BatchImported {
                batch_id: batch.id.clone(),
                barcode: batch.barcode.clone(),
                product_id,
                location,
            })
            .await;
        Ok(batch)
    }

    /// Finds one batch by barcode or id.
    #[instrument(skip(self))]
    pub async fn get_by_barcode(&self, barcode: &str) -> Result<stock_batch::Model, ServiceError> {
        self.find_by_barcode_or_id(&*self.db, barcode)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", barcode)))
    }

    async fn find_by_barcode_or_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        barcode: &str,
    ) -> Result<Option<stock_batch::Model>, ServiceError> {
        Ok(StockBatch::find()
            .filter(
                stock_batch::Column::Barcode
                    .eq(barcode)
                    .or(stock_batch::Column::Id.eq(barcode)),
            )
            .one(conn)
            .await?)
    }

    /// Computes a FEFO plan for a product at a location without mutating
    /// anything. Returns a partial plan plus shortfall when supply is short.
    #[instrument(skip(self))]
    pub async fn select_batches(
        &self,
        location: &str,
        product_id: &str,
        required_qty: i32,
    ) -> Result<AllocationPlan, ServiceError> {
        if required_qty < 0 {
            return Err(ServiceError::ValidationError(
                "required quantity must be non-negative".to_string(),
            ));
        }
        let candidates = StockBatch::find()
            .filter(stock_batch::Column::Location.eq(location))
            .filter(stock_batch::Column::ProductId.eq(product_id))
            .filter(stock_batch::Column::RemainingQuantity.gt(0))
            .all(&*self.db)
            .await?;
        Ok(plan_fefo(&candidates, required_qty))
    }

    /// Dispatches stock out of one scanned batch, debiting the ledger.
    #[instrument(skip(self))]
    pub async fn dispatch_by_barcode(
        &self,
        barcode: &str,
        qty: i32,
        destination: Option<&str>,
        actor: &str,
    ) -> Result<stock_batch::Model, ServiceError> {
        if qty <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be a positive integer".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let batch = self
            .find_by_barcode_or_id(&txn, barcode)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", barcode)))?;

        if batch.remaining_quantity < qty {
            return Err(ServiceError::InsufficientStock(format!(
                "Batch {} holds {} units, {} requested",
                batch.barcode, batch.remaining_quantity, qty
            )));
        }

        let plan = AllocationPlan {
            lines: vec![BatchAllocation {
                batch_id: batch.id.clone(),
                barcode: batch.barcode.clone(),
                batch_no: batch.batch_no.clone(),
                expiry: batch.expiry,
                remaining_before: batch.remaining_quantity,
                take: qty,
            }],
            shortfall: 0,
        };
        let exhausted = apply_allocation(&txn, &plan).await?;
        apply_stock_action(
            &txn,
            &batch.location,
            &batch.product_id,
            qty,
            StockAction::Out,
            Some("barcode-dispatch"),
            destination,
        )
        .await?;
        txn.commit().await?;

        for batch_id in exhausted {
            self.event_sender
                .publish(Event::BatchExhausted {
                    batch_id,
                    barcode: batch.barcode.clone(),
                })
                .await;
        }

        self.get_by_barcode(barcode).await
    }

    /// Receives stock back into a scanned batch (returns flow), crediting
    /// the ledger at the receiving location.
    #[instrument(skip(self))]
    pub async fn receive_by_barcode(
        &self,
        barcode: &str,
        qty: i32,
        location: Option<&str>,
        actor: &str,
    ) -> Result<stock_batch::Model, ServiceError> {
        if qty <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be a positive integer".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let batch = self
            .find_by_barcode_or_id(&txn, barcode)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", barcode)))?;

        let target_location = location.unwrap_or(&batch.location).to_string();
        let now = Utc::now();

        let mut active: stock_batch::ActiveModel = batch.clone().into();
        active.quantity = Set(batch.quantity + qty);
        active.remaining_quantity = Set(batch.remaining_quantity + qty);
        active.location = Set(target_location.clone());
        active.status = Set(BatchStatus::Available.as_str().to_string());
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        apply_stock_action(
            &txn,
            &target_location,
            &batch.product_id,
            qty,
            StockAction::In,
            Some("barcode-receipt"),
            Some(&batch.barcode),
        )
        .await?;
        txn.commit().await?;

        Ok(updated)
    }

    /// Operator removal of a batch. Remaining stock is debited from the
    /// ledger so the aggregate stays consistent.
    #[instrument(skip(self))]
    pub async fn remove_batch(&self, barcode: &str) -> Result<stock_batch::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let batch = self
            .find_by_barcode_or_id(&txn, barcode)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", barcode)))?;

        if batch.remaining_quantity > 0 {
            apply_stock_action(
                &txn,
                &batch.location,
                &batch.product_id,
                batch.remaining_quantity,
                StockAction::Out,
                Some("batch-removed"),
                Some(&batch.barcode),
            )
            .await?;
        }
        batch.clone().delete(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .publish(Event::BatchRemoved {
                batch_id: batch.id.clone(),
                barcode: batch.barcode.clone(),
            })
            .await;
        Ok(batch)
    }

    /// Lists all batches, optionally scoped to one location.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        location: Option<&str>,
    ) -> Result<Vec<stock_batch::Model>, ServiceError> {
        let mut query = StockBatch::find().order_by_asc(stock_batch::Column::Expiry);
        if let Some(location) = location {
            query = query.filter(stock_batch::Column::Location.eq(location));
        }
        Ok(query.all(&*self.db).await?)
    }

    /// Batches with stock remaining whose expiry falls within `days` from
    /// today. Used by the expiry report and recall checks.
    #[instrument(skip(self))]
    pub async fn expiring_within(&self, days: i64) -> Result<Vec<stock_batch::Model>, ServiceError> {
        if days < 0 {
            return Err(ServiceError::ValidationError(
                "days must be non-negative".to_string(),
            ));
        }
        let horizon = Utc::now().date_naive() + chrono::Duration::days(days);
        Ok(StockBatch::find()
            .filter(stock_batch::Column::RemainingQuantity.gt(0))
            .filter(stock_batch::Column::Expiry.is_not_null())
            .filter(stock_batch::Column::Expiry.lte(horizon))
            .order_by_asc(stock_batch::Column::Expiry)
            .all(&*self.db)
            .await?)
    }

    /// Aggregate statistics over the batch store.
    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<BatchStatistics, ServiceError> {
        let batches = StockBatch::find().all(&*self.db).await?;
        let today = Utc::now().date_naive();
        let warning_horizon = today + chrono::Duration::days(EXPIRY_WARNING_DAYS);

        let mut total_remaining: i64 = 0;
        let mut expiring_soon = 0u64;
        let mut expired = 0u64;
        let mut low_products = std::collections::HashSet::new();

        for batch in &batches {
            total_remaining += i64::from(batch.remaining_quantity);
            if let Some(expiry) = batch.expiry {
                if expiry < today {
                    expired += 1;
                } else if expiry <= warning_horizon {
                    expiring_soon += 1;
                }
            }
            if batch.remaining_quantity <= LOW_BATCH_THRESHOLD {
                low_products.insert(batch.description.clone());
            }
        }

        Ok(BatchStatistics {
            total_batches: batches.len() as u64,
            total_remaining_quantity: total_remaining,
            expiring_soon,
            expired,
            low_stock_products: low_products.len() as u64,
            computed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(id: &str, expiry: Option<&str>, remaining: i32) -> stock_batch::Model {
        let now = Utc::now();
        stock_batch::Model {
            id: id.to_string(),
            product_id: "SPIRULINA".to_string(),
            description: "Spirulina 500mg".to_string(),
            batch_no: format!("BN-{}", id),
            carton_no: None,
            expiry: expiry.map(|e| NaiveDate::parse_from_str(e, "%Y-%m-%d").unwrap()),
            quantity: remaining,
            remaining_quantity: remaining,
            total_cartons: 1,
            location: "warehouse-windhoek".to_string(),
            status: BatchStatus::Available.as_str().to_string(),
            barcode: format!("BC-{}", id),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fefo_takes_earliest_expiring_batches_first() {
        let batches = vec![
            batch("b2", Some("2025-03-01"), 10),
            batch("b1", Some("2025-01-01"), 5),
        ];
        let plan = plan_fefo(&batches, 8);
        assert!(plan.is_complete());
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].batch_id, "b1");
        assert_eq!(plan.lines[0].take, 5);
        assert_eq!(plan.lines[1].batch_id, "b2");
        assert_eq!(plan.lines[1].take, 3);
    }

    #[test]
    fn fefo_sorts_unknown_expiry_last() {
        let batches = vec![
            batch("no-expiry", None, 50),
            batch("dated", Some("2026-06-01"), 4),
        ];
        let plan = plan_fefo(&batches, 10);
        assert_eq!(plan.lines[0].batch_id, "dated");
        assert_eq!(plan.lines[0].take, 4);
        assert_eq!(plan.lines[1].batch_id, "no-expiry");
        assert_eq!(plan.lines[1].take, 6);
    }

    #[test]
    fn fefo_reports_shortfall_on_partial_supply() {
        let batches = vec![batch("only", Some("2025-05-01"), 3)];
        let plan = plan_fefo(&batches, 10);
        assert!(!plan.is_complete());
        assert_eq!(plan.allocated(), 3);
        assert_eq!(plan.shortfall, 7);
    }

    #[test]
    fn fefo_skips_exhausted_batches() {
        let mut empty = batch("empty", Some("2024-01-01"), 0);
        empty.status = BatchStatus::Exhausted.as_str().to_string();
        let batches = vec![empty, batch("live", Some("2025-01-01"), 10)];
        let plan = plan_fefo(&batches, 5);
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].batch_id, "live");
    }

    #[test]
    fn fefo_zero_required_is_an_empty_plan() {
        let batches = vec![batch("b1", Some("2025-01-01"), 5)];
        let plan = plan_fefo(&batches, 0);
        assert!(plan.lines.is_empty());
        assert!(plan.is_complete());
    }

    #[test]
    fn expiry_normalization_accepts_portal_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert_eq!(normalize_expiry("2025-07"), Some(expected));
        assert_eq!(normalize_expiry("2025/07"), Some(expected));
        assert_eq!(normalize_expiry("07-2025"), Some(expected));
        assert_eq!(normalize_expiry("07/2025"), Some(expected));
        assert_eq!(normalize_expiry("2025-07-19"), Some(expected));
        assert_eq!(normalize_expiry("not a date"), None);
        assert_eq!(normalize_expiry(""), None);
        assert_eq!(normalize_expiry("2025-13"), None);
    }

    #[test]
    fn batch_barcodes_use_the_restricted_alphabet() {
        let barcode = generate_batch_barcode("Spirulina 500mg", "BN 42/A");
        assert!(barcode.starts_with("BC-"));
        assert!(barcode
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_batches() -> impl Strategy<Value = Vec<stock_batch::Model>> {
            proptest::collection::vec((0i32..200, proptest::option::of(0i64..3650)), 0..12).prop_map(
                |specs| {
                    specs
                        .into_iter()
                        .enumerate()
                        .map(|(i, (remaining, expiry_offset))| {
                            let expiry = expiry_offset.map(|days| {
                                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                                    + chrono::Duration::days(days)
                            });
                            let mut model =
                                batch(&format!("b{}", i), None, remaining);
                            model.expiry = expiry;
                            model
                        })
                        .collect()
                },
            )
        }

        proptest! {
            #[test]
            fn allocation_accounts_for_every_required_unit(
                batches in arb_batches(),
                required in 0i32..1000,
            ) {
                let plan = plan_fefo(&batches, required);
                let supply: i32 = batches
                    .iter()
                    .filter(|b| b.remaining_quantity > 0)
                    .map(|b| b.remaining_quantity)
                    .sum();

                // Allocated plus shortfall always equals the requirement.
                prop_assert_eq!(plan.allocated() + plan.shortfall, required.max(0));
                // Never allocates more than the available supply.
                prop_assert!(plan.allocated() <= supply);
                // No line overdraws its batch, and no line is empty.
                for line in &plan.lines {
                    prop_assert!(line.take > 0);
                    prop_assert!(line.take <= line.remaining_before);
                }
                // Lines are in FEFO order: dated batches first, ascending.
                let expiries: Vec<_> = plan.lines.iter().map(|l| l.expiry).collect();
                for pair in expiries.windows(2) {
                    match (pair[0], pair[1]) {
                        (Some(a), Some(b)) => prop_assert!(a <= b),
                        (None, Some(_)) => prop_assert!(false, "undated batch before dated"),
                        _ => {}
                    }
                }
            }
        }
    }
}
