//! Workflow tests for the stock request approval chain.

mod common;

use common::TestApp;
use pharmstock_api::services::stock_requests::{
    CreateStockRequestInput, UpdateStockRequestInput,
};
use serde_json::json;

fn request_input(branch: &str) -> CreateStockRequestInput {
    serde_json::from_value(json!({
        "branch": branch,
        "items": [
            { "product_id": "SPIRULINA", "description": "Spirulina 500mg", "quantity": 120 },
            { "product_id": "OMEGA3", "description": "Omega 3 Premium", "quantity": 60 }
        ],
        "requested_by": "Maria",
        "requested_by_role": "branch_manager"
    }))
    .unwrap()
}

#[tokio::test]
async fn approval_chain_runs_to_approved() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stock_requests;

    let request = svc.create(request_input("townshop")).await.unwrap();
    assert_eq!(request.status, "pending_stock_review");
    assert!(request.request_number.starts_with("SRQ-TOWNSHOP-"));

    let request = svc
        .advance(&request.id, "stock_manager", true, "Sam", None)
        .await
        .unwrap();
    assert_eq!(request.status, "pending_gm");

    let request = svc
        .advance(&request.id, "gm", true, "Grace", Some("ok to proceed"))
        .await
        .unwrap();
    assert_eq!(request.status, "pending_warehouse");

    let request = svc
        .advance(&request.id, "warehouse", true, "Willem", None)
        .await
        .unwrap();
    assert_eq!(request.status, "approved");
    assert_eq!(request.approved_by.as_deref(), Some("Willem"));
    assert!(request.approved_at.is_some());

    let approvals = request.approvals.as_array().unwrap();
    assert_eq!(approvals.len(), 3);
    // Newest first: warehouse decision on top.
    assert_eq!(approvals[0]["role"], "warehouse");
    assert_eq!(approvals[2]["role"], "stock_manager");

    let history = request.history.as_array().unwrap();
    assert_eq!(history.len(), 4); // created + three decisions
    assert_eq!(history[0]["action"], "approved");
    assert_eq!(history[3]["action"], "created");
}

#[tokio::test]
async fn rejection_is_terminal_and_advance_becomes_a_noop() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stock_requests;

    let request = svc.create(request_input("oshakati")).await.unwrap();
    let request = svc
        .advance(&request.id, "stock_manager", true, "Sam", None)
        .await
        .unwrap();
    let request = svc
        .advance(&request.id, "gm", false, "Grace", Some("budget freeze"))
        .await
        .unwrap();
    assert_eq!(request.status, "rejected");
    assert_eq!(request.rejected_by.as_deref(), Some("Grace"));

    // Retried decisions on a terminal request change nothing.
    let replay = svc
        .advance(&request.id, "warehouse", true, "Willem", None)
        .await
        .unwrap();
    assert_eq!(replay.status, "rejected");
    assert_eq!(replay.version, request.version);
    assert_eq!(
        replay.approvals.as_array().unwrap().len(),
        request.approvals.as_array().unwrap().len()
    );
}

#[tokio::test]
async fn rejection_from_final_stage_then_noop() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stock_requests;

    let request = svc.create(request_input("townshop")).await.unwrap();
    svc.advance(&request.id, "stock_manager", true, "Sam", None)
        .await
        .unwrap();
    svc.advance(&request.id, "gm", true, "Grace", None)
        .await
        .unwrap();
    let request = svc
        .advance(&request.id, "warehouse", false, "Willem", None)
        .await
        .unwrap();
    assert_eq!(request.status, "rejected");

    let replay = svc
        .advance(&request.id, "warehouse", false, "Willem", None)
        .await
        .unwrap();
    assert_eq!(replay.status, "rejected");
}

#[tokio::test]
async fn create_rejects_an_empty_item_list_before_writing() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stock_requests;

    // All items are malformed and get dropped by normalization.
    let input: CreateStockRequestInput = serde_json::from_value(json!({
        "branch": "townshop",
        "items": [
            { "product_id": "SPIRULINA", "quantity": 0 },
            { "quantity": 10 }
        ]
    }))
    .unwrap();

    let err = svc.create(input).await.unwrap_err();
    assert!(matches!(
        err,
        pharmstock_api::errors::ServiceError::ValidationError(_)
    ));
    assert!(svc.list(Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn string_quantities_are_coerced_like_the_portal_sends_them() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stock_requests;

    let input: CreateStockRequestInput = serde_json::from_value(json!({
        "branch": "townshop",
        "items": [{ "product_id": "GINSENG", "quantity": "42" }]
    }))
    .unwrap();
    let request = svc.create(input).await.unwrap();
    let items = request.items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 42);
}

#[tokio::test]
async fn terminal_requests_cannot_be_edited() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stock_requests;

    let request = svc.create(request_input("townshop")).await.unwrap();
    svc.advance(&request.id, "stock_manager", false, "Sam", None)
        .await
        .unwrap();

    let err = svc
        .update(
            &request.id,
            UpdateStockRequestInput {
                notes: Some("too late".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        pharmstock_api::errors::ServiceError::InvalidTransition(_)
    ));
}

#[tokio::test]
async fn requests_are_reachable_by_request_number_and_filterable() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stock_requests;

    let a = svc.create(request_input("townshop")).await.unwrap();
    let b = svc.create(request_input("oshakati")).await.unwrap();

    let by_number = svc.get(&a.request_number).await.unwrap();
    assert_eq!(by_number.id, a.id);

    let filtered = svc
        .list(pharmstock_api::services::stock_requests::StockRequestFilter {
            branch: Some("oshakati".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, b.id);
}
