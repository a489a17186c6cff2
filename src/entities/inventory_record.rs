use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Aggregate stock position for one product at one location.
///
/// The record is a cached projection: where batches exist for the product,
/// `quantity` equals the sum of non-exhausted batch remaining quantities at
/// the location. All mutations go through the ledger service, which bumps
/// `version` for optimistic locking and maintains the bounded `history` ring.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub location: String,
    pub product_id: String,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub reorder_level: i32,
    #[sea_orm(column_type = "Json")]
    pub history: Json,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Stock not earmarked for a pending operation.
    pub fn available_quantity(&self) -> i32 {
        self.quantity - self.reserved_quantity
    }

    /// True when available stock has fallen to the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.available_quantity() <= self.reorder_level
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
