pub mod batches;
pub mod inventory;
pub mod stock_requests;
pub mod transfers;
