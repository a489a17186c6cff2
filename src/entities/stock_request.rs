use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A branch replenishment or return request moving through the approval
/// chain. `items`, `approvals` and `history` are JSON documents; `history`
/// is append-only, newest first, and never rewritten. `approved_by` /
/// `approved_at` are set only on the terminal-positive transition.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub request_number: String,
    pub requesting_branch: String,
    pub request_type: String,
    pub priority: String,
    pub status: String,
    #[sea_orm(column_type = "Json")]
    pub items: Json,
    pub notes: Option<String>,
    pub return_date: Option<NaiveDate>,
    pub created_by: String,
    pub created_by_role: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Json")]
    pub approvals: Json,
    #[sea_orm(column_type = "Json")]
    pub history: Json,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_transfer::Entity")]
    StockTransfers,
}

impl Related<super::stock_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransfers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Approval chain position of a stock request.
///
/// `Pending` is a legacy alias still emitted by older portal clients; it
/// advances the same way `PendingStockReview` does after the first review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    PendingStockReview,
    PendingGm,
    PendingWarehouse,
    Approved,
    Rejected,
    Pending,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::PendingStockReview => "pending_stock_review",
            RequestStatus::PendingGm => "pending_gm",
            RequestStatus::PendingWarehouse => "pending_warehouse",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Pending => "pending",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending_stock_review" => Some(RequestStatus::PendingStockReview),
            "pending_gm" => Some(RequestStatus::PendingGm),
            "pending_warehouse" => Some(RequestStatus::PendingWarehouse),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            "pending" => Some(RequestStatus::Pending),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }

    /// Next status for an approval decision at the current stage.
    /// Returns `None` when the current state is terminal.
    pub fn next(&self, approved: bool) -> Option<Self> {
        if self.is_terminal() {
            return None;
        }
        if !approved {
            return Some(RequestStatus::Rejected);
        }
        Some(match self {
            RequestStatus::PendingStockReview | RequestStatus::Pending => RequestStatus::PendingGm,
            RequestStatus::PendingGm => RequestStatus::PendingWarehouse,
            RequestStatus::PendingWarehouse => RequestStatus::Approved,
            RequestStatus::Approved | RequestStatus::Rejected => unreachable!(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_chain_progresses_monotonically() {
        assert_eq!(
            RequestStatus::PendingStockReview.next(true),
            Some(RequestStatus::PendingGm)
        );
        assert_eq!(
            RequestStatus::PendingGm.next(true),
            Some(RequestStatus::PendingWarehouse)
        );
        assert_eq!(
            RequestStatus::PendingWarehouse.next(true),
            Some(RequestStatus::Approved)
        );
    }

    #[test]
    fn legacy_pending_advances_to_gm() {
        assert_eq!(
            RequestStatus::Pending.next(true),
            Some(RequestStatus::PendingGm)
        );
    }

    #[test]
    fn rejection_is_reachable_from_every_stage() {
        for status in [
            RequestStatus::PendingStockReview,
            RequestStatus::Pending,
            RequestStatus::PendingGm,
            RequestStatus::PendingWarehouse,
        ] {
            assert_eq!(status.next(false), Some(RequestStatus::Rejected));
        }
    }

    #[test]
    fn terminal_states_do_not_advance() {
        assert_eq!(RequestStatus::Approved.next(true), None);
        assert_eq!(RequestStatus::Rejected.next(false), None);
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
    }
}
