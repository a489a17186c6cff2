use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A received lot of one product at one location.
///
/// Expiry is tracked to month precision and stored as the first day of the
/// month; batches without a parseable expiry sort last during FEFO
/// allocation. `remaining_quantity` is decremented by dispatch and
/// incremented by receipt (returns); a batch is never deleted while stock
/// remains unless an operator removes it explicitly.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub product_id: String,
    pub description: String,
    pub batch_no: String,
    pub carton_no: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub quantity: i32,
    pub remaining_quantity: i32,
    pub total_cartons: i32,
    pub location: String,
    pub status: String,
    #[sea_orm(unique)]
    pub barcode: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Available,
    Exhausted,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Available => "available",
            BatchStatus::Exhausted => "exhausted",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "available" => Some(BatchStatus::Available),
            "exhausted" => Some(BatchStatus::Exhausted),
            _ => None,
        }
    }
}
