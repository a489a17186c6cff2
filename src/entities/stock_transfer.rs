use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stock movement from a warehouse to a branch, usually spawned from an
/// approved stock request. `delivered` is advisory; `received` is the only
/// state that credits destination inventory. A transfer owns at most one
/// dispatch note.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub request_id: Option<String>,
    pub request_number: Option<String>,
    pub from_warehouse: String,
    pub to_branch: String,
    pub status: String,
    #[sea_orm(column_type = "Json")]
    pub items: Json,
    pub dispatch_notes: Option<String>,
    pub created_by: String,
    pub dispatched_by: Option<String>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_by: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub received_by: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub history: Json,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_request::Entity",
        from = "Column::RequestId",
        to = "super::stock_request::Column::Id"
    )]
    StockRequest,
    #[sea_orm(has_one = "super::dispatch_note::Entity")]
    DispatchNote,
}

impl Related<super::stock_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockRequest.def()
    }
}

impl Related<super::dispatch_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DispatchNote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    Dispatched,
    Delivered,
    Received,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Dispatched => "dispatched",
            TransferStatus::Delivered => "delivered",
            TransferStatus::Received => "received",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TransferStatus::Pending),
            "dispatched" => Some(TransferStatus::Dispatched),
            "delivered" => Some(TransferStatus::Delivered),
            "received" => Some(TransferStatus::Received),
            "cancelled" => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Received | TransferStatus::Cancelled)
    }
}
