//! Dispatch protocol tests: FEFO debits, all-or-nothing failure, dispatch
//! note idempotence, and receipt crediting the destination exactly once.

mod common;

use common::TestApp;
use pharmstock_api::entities::{inventory_record, stock_batch};
use pharmstock_api::errors::ServiceError;
use pharmstock_api::services::batches::BatchImportInput;
use pharmstock_api::services::transfers::{CreateTransferInput, DispatchMeta};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

const WAREHOUSE: &str = "warehouse-windhoek";

async fn import(app: &TestApp, product: &str, batch_no: &str, expiry: &str, qty: i32) {
    let input: BatchImportInput = serde_json::from_value(json!({
        "description": product,
        "product_id": product,
        "batch_no": batch_no,
        "expiry_date": expiry,
        "quantity": qty,
        "location": WAREHOUSE
    }))
    .unwrap();
    app.state
        .services
        .batches
        .import_batch(input, "Goods-In")
        .await
        .unwrap();
}

fn transfer_input(to_branch: &str, product: &str, qty: i32) -> CreateTransferInput {
    serde_json::from_value(json!({
        "to_branch": to_branch,
        "from_warehouse": WAREHOUSE,
        "items": [{ "product_id": product, "description": product, "quantity": qty }]
    }))
    .unwrap()
}

async fn warehouse_quantity(app: &TestApp, location: &str, product: &str) -> i32 {
    inventory_record::Entity::find()
        .filter(inventory_record::Column::Location.eq(location))
        .filter(inventory_record::Column::ProductId.eq(product))
        .one(&*app.state.db)
        .await
        .unwrap()
        .map(|r| r.quantity)
        .unwrap_or(0)
}

async fn batch_remaining_sum(app: &TestApp, location: &str, product: &str) -> i32 {
    stock_batch::Entity::find()
        .filter(stock_batch::Column::Location.eq(location))
        .filter(stock_batch::Column::ProductId.eq(product))
        .all(&*app.state.db)
        .await
        .unwrap()
        .iter()
        .map(|b| b.remaining_quantity)
        .sum()
}

#[tokio::test]
async fn dispatch_debits_fefo_order_and_writes_the_note() {
    let app = TestApp::new().await;
    import(&app, "SPIRULINA", "B-EARLY", "2025-01", 5).await;
    import(&app, "SPIRULINA", "B-LATE", "2025-03", 10).await;

    let transfer = app
        .state
        .services
        .transfers
        .create(transfer_input("townshop", "SPIRULINA", 8))
        .await
        .unwrap();

    let outcome = app
        .state
        .services
        .transfers
        .dispatch(&transfer.id, "Willem", DispatchMeta::default())
        .await
        .unwrap();

    assert_eq!(outcome.transfer.status, "dispatched");
    let note = &outcome.dispatch_note;
    assert_eq!(note.transfer_id, transfer.id);
    assert_eq!(note.status, "in_transit");
    assert!(note.barcode.starts_with("DN-"));

    // The note records the allocation actually used: 5 from the earlier
    // batch, 3 from the later one.
    let items = note.items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    let batches = items[0]["batches"].as_array().unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0]["batch_no"], "B-EARLY");
    assert_eq!(batches[0]["take"], 5);
    assert_eq!(batches[1]["batch_no"], "B-LATE");
    assert_eq!(batches[1]["take"], 3);

    // Earlier batch is emptied exactly and flips to exhausted.
    let early = stock_batch::Entity::find()
        .filter(stock_batch::Column::BatchNo.eq("B-EARLY"))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(early.remaining_quantity, 0);
    assert_eq!(early.status, "exhausted");

    // Aggregate ledger stays the projection of batch remainders.
    assert_eq!(warehouse_quantity(&app, WAREHOUSE, "SPIRULINA").await, 7);
    assert_eq!(batch_remaining_sum(&app, WAREHOUSE, "SPIRULINA").await, 7);
}

#[tokio::test]
async fn redispatch_updates_the_existing_note_without_a_second_debit() {
    let app = TestApp::new().await;
    import(&app, "SPIRULINA", "B-1", "2025-06", 50).await;

    let transfer = app
        .state
        .services
        .transfers
        .create(transfer_input("townshop", "SPIRULINA", 20))
        .await
        .unwrap();
    let svc = &app.state.services.transfers;

    let first = svc
        .dispatch(&transfer.id, "Willem", DispatchMeta::default())
        .await
        .unwrap();
    let second = svc
        .dispatch(&transfer.id, "Willem", DispatchMeta::default())
        .await
        .unwrap();

    assert_eq!(first.dispatch_note.id, second.dispatch_note.id);
    assert_eq!(first.dispatch_note.barcode, second.dispatch_note.barcode);
    assert_eq!(warehouse_quantity(&app, WAREHOUSE, "SPIRULINA").await, 30);
}

#[tokio::test]
async fn dispatch_is_all_or_nothing_across_items() {
    let app = TestApp::new().await;
    import(&app, "SPIRULINA", "B-1", "2025-06", 100).await;
    import(&app, "OMEGA3", "B-2", "2025-06", 10).await;

    let input: CreateTransferInput = serde_json::from_value(json!({
        "to_branch": "townshop",
        "from_warehouse": WAREHOUSE,
        "items": [
            { "product_id": "SPIRULINA", "quantity": 50 },
            { "product_id": "OMEGA3", "quantity": 25 }
        ]
    }))
    .unwrap();
    let transfer = app.state.services.transfers.create(input).await.unwrap();

    let err = app
        .state
        .services
        .transfers
        .dispatch(&transfer.id, "Willem", DispatchMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // No partial debit: the satisfiable first line was rolled back too.
    assert_eq!(warehouse_quantity(&app, WAREHOUSE, "SPIRULINA").await, 100);
    assert_eq!(warehouse_quantity(&app, WAREHOUSE, "OMEGA3").await, 10);
    assert_eq!(batch_remaining_sum(&app, WAREHOUSE, "SPIRULINA").await, 100);

    let transfer = app.state.services.transfers.get(&transfer.id).await.unwrap();
    assert_eq!(transfer.status, "pending");
}

#[tokio::test]
async fn receive_credits_the_branch_exactly_once() {
    let app = TestApp::new().await;
    import(&app, "SPIRULINA", "B-1", "2025-06", 100).await;

    let svc = &app.state.services.transfers;
    let transfer = svc
        .create(transfer_input("townshop", "SPIRULINA", 40))
        .await
        .unwrap();
    svc.dispatch(&transfer.id, "Willem", DispatchMeta::default())
        .await
        .unwrap();

    let received = svc.receive(&transfer.id, "Maria").await.unwrap();
    assert_eq!(received.status, "received");
    assert_eq!(warehouse_quantity(&app, "townshop", "SPIRULINA").await, 40);

    // Idempotent: the destination is credited exactly once.
    let replay = svc.receive(&transfer.id, "Maria").await.unwrap();
    assert_eq!(replay.status, "received");
    assert_eq!(warehouse_quantity(&app, "townshop", "SPIRULINA").await, 40);

    let notes = svc
        .list_dispatch_notes(Default::default())
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].status, "received");
    assert_eq!(notes[0].received_by.as_deref(), Some("Maria"));
}

#[tokio::test]
async fn deliver_is_advisory_and_receive_still_works_after_it() {
    let app = TestApp::new().await;
    import(&app, "SPIRULINA", "B-1", "2025-06", 30).await;

    let svc = &app.state.services.transfers;
    let transfer = svc
        .create(transfer_input("townshop", "SPIRULINA", 10))
        .await
        .unwrap();
    svc.dispatch(&transfer.id, "Willem", DispatchMeta::default())
        .await
        .unwrap();

    let delivered = svc.deliver(&transfer.id, "Courier").await.unwrap();
    assert_eq!(delivered.status, "delivered");
    // No inventory effect from delivery.
    assert_eq!(warehouse_quantity(&app, "townshop", "SPIRULINA").await, 0);

    let received = svc.receive(&transfer.id, "Maria").await.unwrap();
    assert_eq!(received.status, "received");
    assert_eq!(warehouse_quantity(&app, "townshop", "SPIRULINA").await, 10);
}

#[tokio::test]
async fn cancelled_transfers_cannot_be_dispatched() {
    let app = TestApp::new().await;
    import(&app, "SPIRULINA", "B-1", "2025-06", 30).await;

    let svc = &app.state.services.transfers;
    let transfer = svc
        .create(transfer_input("townshop", "SPIRULINA", 10))
        .await
        .unwrap();

    let cancelled = svc
        .cancel(&transfer.id, "Willem", Some("raised in error"))
        .await
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");

    let err = svc
        .dispatch(&transfer.id, "Willem", DispatchMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
    assert_eq!(warehouse_quantity(&app, WAREHOUSE, "SPIRULINA").await, 30);
}

#[tokio::test]
async fn transfers_only_spawn_from_approved_requests() {
    let app = TestApp::new().await;
    let request = app
        .state
        .services
        .stock_requests
        .create(
            serde_json::from_value(json!({
                "branch": "townshop",
                "items": [{ "product_id": "SPIRULINA", "quantity": 10 }]
            }))
            .unwrap(),
        )
        .await
        .unwrap();

    let input: CreateTransferInput = serde_json::from_value(json!({
        "request_id": request.id
    }))
    .unwrap();
    let err = app.state.services.transfers.create(input).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn concurrent_dispatches_cannot_overdraw_the_warehouse() {
    let app = TestApp::new().await;
    import(&app, "SPIRULINA", "B-1", "2025-06", 100).await;

    let svc = app.state.services.transfers.clone();
    let a = svc
        .create(transfer_input("townshop", "SPIRULINA", 80))
        .await
        .unwrap();
    let b = svc
        .create(transfer_input("oshakati", "SPIRULINA", 80))
        .await
        .unwrap();

    let svc_a = svc.clone();
    let id_a = a.id.clone();
    let task_a = tokio::spawn(async move {
        svc_a.dispatch(&id_a, "Willem", DispatchMeta::default()).await
    });
    let svc_b = svc.clone();
    let id_b = b.id.clone();
    let task_b = tokio::spawn(async move {
        svc_b.dispatch(&id_b, "Willem", DispatchMeta::default()).await
    });

    let results = [task_a.await.unwrap(), task_b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let shortfalls = results
        .iter()
        .filter(|r| matches!(r, Err(ServiceError::InsufficientStock(_))))
        .count();

    assert_eq!(successes, 1, "exactly one dispatch wins the stock");
    assert_eq!(shortfalls, 1, "the loser aborts with InsufficientStock");
    assert_eq!(warehouse_quantity(&app, WAREHOUSE, "SPIRULINA").await, 20);
    assert_eq!(batch_remaining_sum(&app, WAREHOUSE, "SPIRULINA").await, 20);
}
