//! HTTP surface: thin axum handlers over the stock lifecycle services.
//! Handlers translate typed service results into status codes and JSON;
//! no business rules live here.

pub mod batches;
pub mod health;
pub mod stock_requests;
pub mod transfers;
pub mod warehouse;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::events::EventSender;
use crate::services::batches::BatchService;
use crate::services::inventory::InventoryLedgerService;
use crate::services::stock_requests::StockRequestService;
use crate::services::transfers::TransferService;

/// Aggregate of the services used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub ledger: InventoryLedgerService,
    pub batches: BatchService,
    pub stock_requests: StockRequestService,
    pub transfers: TransferService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        default_warehouse: String,
    ) -> Self {
        Self {
            ledger: InventoryLedgerService::new(db.clone(), event_sender.clone()),
            batches: BatchService::new(db.clone(), event_sender.clone()),
            stock_requests: StockRequestService::new(db.clone(), event_sender.clone()),
            transfers: TransferService::new(db, event_sender, default_warehouse),
        }
    }
}
