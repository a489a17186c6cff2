use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Barcoded proof-of-shipment tying a transfer to the batches actually sent.
///
/// The unique `transfer_id` column is the storage-level backstop for the
/// one-note-per-transfer rule; re-dispatching an already-dispatched transfer
/// refreshes this row instead of inserting a second one. `items` carries the
/// FEFO allocation used at dispatch time for recall traceability.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dispatch_notes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub transfer_id: String,
    pub request_id: Option<String>,
    pub request_number: Option<String>,
    #[sea_orm(unique)]
    pub barcode: String,
    pub from_warehouse: String,
    pub to_branch: String,
    #[sea_orm(column_type = "Json")]
    pub items: Json,
    pub status: String,
    pub expected_arrival: Option<DateTime<Utc>>,
    pub dispatched_by: String,
    pub dispatched_at: DateTime<Utc>,
    pub received_by: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_transfer::Entity",
        from = "Column::TransferId",
        to = "super::stock_transfer::Column::Id"
    )]
    StockTransfer,
}

impl Related<super::stock_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransfer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchNoteStatus {
    InTransit,
    Received,
}

impl DispatchNoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchNoteStatus::InTransit => "in_transit",
            DispatchNoteStatus::Received => "received",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "in_transit" => Some(DispatchNoteStatus::InTransit),
            "received" => Some(DispatchNoteStatus::Received),
            _ => None,
        }
    }
}
