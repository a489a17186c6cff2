//! End-to-end lifecycle over the HTTP surface: a branch requests stock,
//! the approval chain runs, the warehouse dispatches against FEFO batches,
//! and the branch confirms receipt.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn townshop_spirulina_request_travels_the_whole_pipeline() {
    let app = TestApp::new().await;

    // Stock the warehouse: 70 units expiring first, 100 expiring later.
    let (status, _) = app
        .post(
            "/api/v1/batches/import",
            json!({
                "description": "SPIRULINA",
                "product_id": "SPIRULINA",
                "batch_no": "SP-2401",
                "expiry_date": "2025-02",
                "quantity": 70,
                "location": "warehouse-windhoek"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(
            "/api/v1/batches/import",
            json!({
                "description": "SPIRULINA",
                "product_id": "SPIRULINA",
                "batch_no": "SP-2407",
                "expiry_date": "2025-08",
                "quantity": 100,
                "location": "warehouse-windhoek"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Branch raises the request.
    let (status, body) = app
        .post(
            "/api/v1/stock-requests",
            json!({
                "branch": "townshop",
                "items": [{ "product_id": "SPIRULINA", "description": "Spirulina 500mg", "quantity": 120 }],
                "requested_by": "Maria"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "pending_stock_review");

    // Approval chain: stock review, GM, warehouse.
    for (role, actor, expected) in [
        ("stock_manager", "Sam", "pending_gm"),
        ("gm", "Grace", "pending_warehouse"),
        ("warehouse", "Willem", "approved"),
    ] {
        let (status, body) = app
            .post(
                &format!("/api/v1/stock-requests/{}/approve", request_id),
                json!({ "role": role, "approved": true, "approved_by": actor }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], expected);
    }

    // The approved request spawns a transfer.
    let (status, body) = app
        .post(
            "/api/v1/transfers",
            json!({
                "request_id": request_id,
                "from_warehouse": "warehouse-windhoek",
                "created_by": "Willem"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let transfer_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["to_branch"], "townshop");
    assert_eq!(body["data"]["status"], "pending");

    // Dispatch debits FEFO order: 70 from the February batch, 50 from August.
    let (status, body) = app
        .post(
            &format!("/api/v1/transfers/{}/dispatch", transfer_id),
            json!({ "dispatched_by": "Willem" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let note = &body["data"]["dispatch_note"];
    let barcode = note["barcode"].as_str().unwrap();
    assert!(barcode.starts_with("DN-"));
    assert_eq!(note["status"], "in_transit");
    let batches = note["items"][0]["batches"].as_array().unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0]["batch_no"], "SP-2401");
    assert_eq!(batches[0]["take"], 70);
    assert_eq!(batches[1]["batch_no"], "SP-2407");
    assert_eq!(batches[1]["take"], 50);

    // Warehouse snapshot reflects the debit.
    let (status, body) = app
        .get("/api/v1/warehouse/warehouse-windhoek/snapshot")
        .await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = body["data"].as_array().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0]["product_id"], "SPIRULINA");
    assert_eq!(snapshot[0]["quantity"], 50);
    assert_eq!(snapshot[0]["available_quantity"], 50);

    // Branch confirms receipt; the note closes.
    let (status, body) = app
        .post(
            &format!("/api/v1/transfers/{}/receive", transfer_id),
            json!({ "actor": "Maria" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "received");

    let (status, body) = app.get("/api/v1/warehouse/townshop/snapshot").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["quantity"], 120);

    let (status, body) = app
        .get(&format!(
            "/api/v1/transfers/dispatch-notes?transfer_id={}",
            transfer_id
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["status"], "received");
    assert_eq!(body["data"][0]["received_by"], "Maria");
}

#[tokio::test]
async fn reservation_accounting_over_http() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post(
            "/api/v1/warehouse/adjust",
            json!({
                "location": "warehouse-windhoek",
                "product_id": "OMEGA3",
                "delta": 100,
                "reason": "opening-stock"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/v1/warehouse/reserve",
            json!({
                "location": "warehouse-windhoek",
                "product_id": "OMEGA3",
                "quantity": 60
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reserved_quantity"], 60);

    // Only 40 remain available; over-reservation is rejected outright.
    let (status, _) = app
        .post(
            "/api/v1/warehouse/reserve",
            json!({
                "location": "warehouse-windhoek",
                "product_id": "OMEGA3",
                "quantity": 41
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Debiting into the reserved pool is rejected too.
    let (status, _) = app
        .post(
            "/api/v1/warehouse/adjust",
            json!({
                "location": "warehouse-windhoek",
                "product_id": "OMEGA3",
                "delta": -50,
                "reason": "breakage"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .post(
            "/api/v1/warehouse/release",
            json!({
                "location": "warehouse-windhoek",
                "product_id": "OMEGA3",
                "quantity": 60
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reserved_quantity"], 0);
    assert_eq!(body["data"]["quantity"], 100);

    // Releasing more than is reserved is a validation error, not a clamp.
    let (status, _) = app
        .post(
            "/api/v1/warehouse/release",
            json!({
                "location": "warehouse-windhoek",
                "product_id": "OMEGA3",
                "quantity": 1
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expiry_report_and_barcode_flows() {
    let app = TestApp::new().await;

    let soon = chrono::Utc::now().date_naive() + chrono::Duration::days(30);
    let far = chrono::Utc::now().date_naive() + chrono::Duration::days(400);
    let (_, body) = app
        .post(
            "/api/v1/batches/import",
            json!({
                "description": "GINSENG",
                "batch_no": "G-1",
                "expiry_date": soon.format("%Y-%m").to_string(),
                "quantity": 40,
                "location": "warehouse-windhoek"
            }),
        )
        .await;
    let barcode = body["data"]["barcode"].as_str().unwrap().to_string();
    app.post(
        "/api/v1/batches/import",
        json!({
            "description": "GINSENG",
            "batch_no": "G-2",
            "expiry_date": far.format("%Y-%m").to_string(),
            "quantity": 40,
            "location": "warehouse-windhoek"
        }),
    )
    .await;

    let (status, body) = app.get("/api/v1/batches/expiring?days=60").await;
    assert_eq!(status, StatusCode::OK);
    let expiring = body["data"].as_array().unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0]["batch_no"], "G-1");

    // Ad-hoc barcode dispatch outside the transfer protocol.
    let (status, body) = app
        .post(
            &format!("/api/v1/batches/{}/dispatch", barcode),
            json!({ "quantity": 40, "location": "townshop" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["remaining_quantity"], 0);
    assert_eq!(body["data"]["status"], "exhausted");

    // Over-dispatch of the emptied batch is rejected.
    let (status, _) = app
        .post(
            &format!("/api/v1/batches/{}/dispatch", barcode),
            json!({ "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // A return brings the batch back to life.
    let (status, body) = app
        .post(
            &format!("/api/v1/batches/{}/receive", barcode),
            json!({ "quantity": 5, "location": "warehouse-windhoek" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["remaining_quantity"], 5);
    assert_eq!(body["data"]["status"], "available");

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "up");
}
