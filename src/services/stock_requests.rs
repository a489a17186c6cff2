//! Stock request workflow.
//!
//! A branch raises a replenishment (or return) request which then moves
//! through the approval chain: stock review, general manager, warehouse.
//! Rejection is reachable from any non-terminal state and is terminal.
//! Re-invoking `advance` on a terminal request is an idempotent no-op so
//! callers may retry safely.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::common::{
    new_entity_id, normalize_items, prepend_capped, random_suffix, ApprovalEntry, HistoryEntry,
    StockItem, StockItemInput,
};
use crate::entities::stock_request::{self, Entity as StockRequest, RequestStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// History entries kept per request.
const REQUEST_HISTORY_CAP: usize = 50;
/// Attempts before an optimistic-lock failure is surfaced.
const CAS_MAX_ATTEMPTS: u32 = 3;

/// Payload for raising a new stock request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateStockRequestInput {
    pub branch: String,
    #[serde(default)]
    pub items: Vec<StockItemInput>,
    pub request_type: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub return_date: Option<NaiveDate>,
    pub requested_by: Option<String>,
    pub requested_by_role: Option<String>,
}

/// Pre-approval edits allowed while a request is still in review.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateStockRequestInput {
    pub items: Option<Vec<StockItemInput>>,
    pub notes: Option<String>,
    pub return_date: Option<NaiveDate>,
    pub reviewed_by: Option<String>,
}

/// Filter for the request list query surface.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StockRequestFilter {
    pub branch: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u64>,
}

fn generate_request_number(branch: &str) -> String {
    let branch_part: String = branch
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    let branch_part = if branch_part.is_empty() {
        "ALL".to_string()
    } else {
        branch_part
    };
    format!(
        "SRQ-{}-{}-{}",
        branch_part,
        Utc::now().format("%Y%m%d"),
        random_suffix(5).to_uppercase()
    )
}

fn history_json(entry: &HistoryEntry) -> serde_json::Value {
    serde_json::to_value(entry).expect("history entry serializes")
}

/// Service for the branch stock request workflow
#[derive(Clone)]
pub struct StockRequestService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockRequestService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Raises a new request. Items are normalized first and an empty result
    /// is rejected before anything is written.
    #[instrument(skip(self, input), fields(branch = %input.branch))]
    pub async fn create(
        &self,
        input: CreateStockRequestInput,
    ) -> Result<stock_request::Model, ServiceError> {
        if input.branch.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "requesting branch is required".to_string(),
            ));
        }
        let items = normalize_items(&input.items);
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "request must contain at least one item with a positive quantity".to_string(),
            ));
        }

        let now = Utc::now();
        let created_by = input
            .requested_by
            .unwrap_or_else(|| "Requestor".to_string());
        let created_by_role = input
            .requested_by_role
            .unwrap_or_else(|| "branch_manager".to_string());
        let status = RequestStatus::PendingStockReview;

        let opening_entry = HistoryEntry {
            action: "created".to_string(),
            actor: created_by.clone(),
            role: Some(created_by_role.clone()),
            timestamp: now,
            status: Some(status.as_str().to_string()),
            notes: None,
        };

        let model = stock_request::ActiveModel {
            id: Set(new_entity_id("REQ")),
            request_number: Set(generate_request_number(&input.branch)),
            requesting_branch: Set(input.branch.trim().to_string()),
            request_type: Set(input
                .request_type
                .unwrap_or_else(|| "sales_replenishment".to_string())),
            priority: Set(input.priority.unwrap_or_else(|| "normal".to_string())),
            status: Set(status.as_str().to_string()),
            items: Set(serde_json::to_value(&items)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?),
            notes: Set(input.notes),
            return_date: Set(input.return_date),
            created_by: Set(created_by),
            created_by_role: Set(created_by_role),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            rejected_by: Set(None),
            rejected_at: Set(None),
            approvals: Set(serde_json::Value::Array(Vec::new())),
            history: Set(serde_json::Value::Array(vec![history_json(&opening_entry)])),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let request = model.insert(&*self.db).await?;
        info!(request_id = %request.id, request_number = %request.request_number, "Created stock request");

        self.event_sender
            .publish(Event::StockRequestCreated {
                request_id: request.id.clone(),
                request_number: request.request_number.clone(),
                branch: request.requesting_branch.clone(),
            })
            .await;
        Ok(request)
    }

    /// Advances the approval chain one step for an approve/reject decision.
    ///
    /// Terminal requests are returned unchanged: retried decisions must not
    /// error and must not duplicate approvals or history entries.
    #[instrument(skip(self))]
    pub async fn advance(
        &self,
        id_or_number: &str,
        role: &str,
        approved: bool,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<stock_request::Model, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .try_advance(id_or_number, role, approved, actor, notes)
                .await
            {
                Err(e) if e.is_retryable() && attempt < CAS_MAX_ATTEMPTS => continue,
                other => return other,
            }
        }
    }

    async fn try_advance(
        &self,
        id_or_number: &str,
        role: &str,
        approved: bool,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<stock_request::Model, ServiceError> {
        let request = self.get(id_or_number).await?;

        let current = RequestStatus::from_str(&request.status).ok_or_else(|| {
            ServiceError::InvalidTransition(format!(
                "Request {} is in unknown status '{}'",
                request.id, request.status
            ))
        })?;

        // Terminal states absorb repeated decisions.
        let Some(next) = current.next(approved) else {
            return Ok(request);
        };

        let now = Utc::now();
        let approval = ApprovalEntry {
            role: role.to_string(),
            approved,
            actor: actor.to_string(),
            timestamp: now,
            notes: notes.unwrap_or_default().to_string(),
        };
        let history_entry = HistoryEntry {
            action: if approved { "approved" } else { "rejected" }.to_string(),
            actor: actor.to_string(),
            role: Some(role.to_string()),
            timestamp: now,
            status: Some(next.as_str().to_string()),
            notes: notes.map(str::to_string),
        };

        let mut approvals = request.approvals.clone();
        prepend_capped(
            &mut approvals,
            serde_json::to_value(&approval).expect("approval entry serializes"),
            REQUEST_HISTORY_CAP,
        );
        let mut history = request.history.clone();
        prepend_capped(&mut history, history_json(&history_entry), REQUEST_HISTORY_CAP);

        let mut update = StockRequest::update_many()
            .col_expr(stock_request::Column::Status, Expr::value(next.as_str()))
            .col_expr(stock_request::Column::Approvals, Expr::value(approvals))
            .col_expr(stock_request::Column::History, Expr::value(history))
            .col_expr(
                stock_request::Column::Version,
                Expr::value(request.version + 1),
            )
            .col_expr(stock_request::Column::UpdatedAt, Expr::value(now));

        if next == RequestStatus::Approved {
            update = update
                .col_expr(stock_request::Column::ApprovedBy, Expr::value(actor))
                .col_expr(stock_request::Column::ApprovedAt, Expr::value(now));
        }
        if next == RequestStatus::Rejected {
            update = update
                .col_expr(stock_request::Column::RejectedBy, Expr::value(actor))
                .col_expr(stock_request::Column::RejectedAt, Expr::value(now));
        }

        let result = update
            .filter(stock_request::Column::Id.eq(request.id.clone()))
            .filter(stock_request::Column::Version.eq(request.version))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrencyConflict(format!(
                "Request {} changed while advancing",
                request.id
            )));
        }

        info!(
            request_id = %request.id,
            from = current.as_str(),
            to = next.as_str(),
            role,
            approved,
            "Advanced stock request"
        );
        self.event_sender
            .publish(Event::StockRequestAdvanced {
                request_id: request.id.clone(),
                old_status: current.as_str().to_string(),
                new_status: next.as_str().to_string(),
                role: role.to_string(),
                approved,
            })
            .await;

        self.get(&request.id).await
    }

    /// Pre-approval edits by the reviewing role.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id_or_number: &str,
        input: UpdateStockRequestInput,
    ) -> Result<stock_request::Model, ServiceError> {
        let request = self.get(id_or_number).await?;

        let current = RequestStatus::from_str(&request.status);
        if matches!(current, Some(s) if s.is_terminal()) {
            return Err(ServiceError::InvalidTransition(format!(
                "Request {} is {} and can no longer be edited",
                request.id, request.status
            )));
        }

        let now = Utc::now();
        let actor = input
            .reviewed_by
            .clone()
            .unwrap_or_else(|| "System".to_string());

        let mut history = request.history.clone();
        prepend_capped(
            &mut history,
            history_json(&HistoryEntry {
                action: "updated".to_string(),
                actor: actor.clone(),
                role: None,
                timestamp: now,
                status: Some(request.status.clone()),
                notes: input.notes.clone(),
            }),
            REQUEST_HISTORY_CAP,
        );

        let mut active: stock_request::ActiveModel = request.clone().into();
        if let Some(raw_items) = &input.items {
            let items = normalize_items(raw_items);
            if items.is_empty() {
                return Err(ServiceError::ValidationError(
                    "request must contain at least one item with a positive quantity".to_string(),
                ));
            }
            active.items = Set(serde_json::to_value(&items)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?);
        }
        if let Some(notes) = input.notes {
            active.notes = Set(Some(notes));
        }
        if let Some(return_date) = input.return_date {
            active.return_date = Set(Some(return_date));
        }
        if let Some(reviewed_by) = input.reviewed_by {
            active.reviewed_by = Set(Some(reviewed_by));
            active.reviewed_at = Set(Some(now));
        }
        active.history = Set(history);
        active.version = Set(request.version + 1);
        active.updated_at = Set(now);

        let updated = active.update(&*self.db).await?;
        self.event_sender
            .publish(Event::StockRequestUpdated {
                request_id: updated.id.clone(),
            })
            .await;
        Ok(updated)
    }

    /// Fetches one request by id or request number.
    #[instrument(skip(self))]
    pub async fn get(&self, id_or_number: &str) -> Result<stock_request::Model, ServiceError> {
        StockRequest::find()
            .filter(
                stock_request::Column::Id
                    .eq(id_or_number)
                    .or(stock_request::Column::RequestNumber.eq(id_or_number)),
            )
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Request {} not found", id_or_number)))
    }

    /// Lists requests newest first, optionally filtered by branch or status.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: StockRequestFilter,
    ) -> Result<Vec<stock_request::Model>, ServiceError> {
        let mut query = StockRequest::find();
        if let Some(branch) = filter.branch.filter(|b| b != "all") {
            query = query.filter(stock_request::Column::RequestingBranch.eq(branch));
        }
        if let Some(status) = filter.status.filter(|s| s != "all") {
            query = query.filter(stock_request::Column::Status.eq(status));
        }
        query = query.order_by_desc(stock_request::Column::CreatedAt);
        if let Some(limit) = filter.limit {
            query = query.limit(limit.min(1000));
        }
        Ok(query.all(&*self.db).await?)
    }

    /// Typed view of a request's item lines.
    pub fn items_of(request: &stock_request::Model) -> Result<Vec<StockItem>, ServiceError> {
        serde_json::from_value(request.items.clone())
            .map_err(|e| ServiceError::InternalError(format!("Malformed items document: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_numbers_carry_branch_and_date() {
        let number = generate_request_number("townshop");
        assert!(number.starts_with("SRQ-TOWNSHOP-"));
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[2].len(), 8);
        assert_eq!(parts[3].len(), 5);
    }

    #[test]
    fn request_numbers_fall_back_for_empty_branch() {
        let number = generate_request_number("--");
        assert!(number.starts_with("SRQ-ALL-"));
    }
}
