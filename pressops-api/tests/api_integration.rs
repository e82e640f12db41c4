//! Integration tests for the publishing-operations API
//!
//! Exercises the full HTTP surface end to end against an in-memory
//! database: author identity, book creation with stage seeding, the
//! stage lock workflow, royalty generation and payout, bulk import,
//! leads, and settings.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use pressops_api::{build_router, AppState};

/// Router over a fresh in-memory database.
///
/// One pooled connection only: each connection to `sqlite::memory:`
/// would otherwise see its own empty database.
async fn setup_app() -> axum::Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .expect("Failed to enable foreign keys");
    pressops_common::db::init::create_all_tables(&pool)
        .await
        .expect("Failed to create schema");
    pressops_common::settings::SiteSettings::ensure_defaults(&pool)
        .await
        .expect("Failed to seed settings");

    build_router(AppState::new(pool))
}

async fn make_request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header("x-actor-id", "test-admin");
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let request = match body {
        Some(json_body) => request.body(Body::from(json_body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json_body)
}

async fn get(app: &axum::Router, path: &str) -> (StatusCode, Value) {
    make_request(app, Method::GET, path, None).await
}

async fn post(app: &axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
    make_request(app, Method::POST, path, Some(body)).await
}

/// Create an author and a book, returning (author_id, book_id).
async fn create_author_and_book(app: &axum::Router) -> (String, String) {
    let (status, author) = post(
        app,
        "/api/authors",
        json!({ "email": "jane@press.example", "name": "Jane Doe" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let author_id = author["id"].as_str().unwrap().to_string();

    let (status, book) = post(
        app,
        "/api/books",
        json!({ "title": "First Book", "author": author_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (author_id, book["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn health_endpoint() {
    let app = setup_app().await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "pressops-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn author_identity_resolution() {
    let app = setup_app().await;

    let (status, created) = post(
        &app,
        "/api/authors",
        json!({ "email": "Jane@Press.Example", "name": "Jane Doe" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    // Email is stored lowercased
    assert_eq!(created["email"], "jane@press.example");
    let uid = created["author_uid"].as_str().unwrap();
    assert!(uid.starts_with("WP"));
    assert_eq!(uid.len(), 7);
    assert_eq!(created["public_slug"], "jane-doe");

    // Resolution by UID and by case-insensitive email reach the same user
    let (status, by_uid) = get(&app, &format!("/api/authors/{}", uid)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_uid["id"], created["id"]);

    let (status, by_email) = get(&app, "/api/authors/JANE@press.example").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_email["id"], created["id"]);

    let (status, err) = get(&app, "/api/authors/nobody@press.example").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn book_creation_seeds_stage_sequence() {
    let app = setup_app().await;
    let (_, book_id) = create_author_and_book(&app).await;

    let (status, stages) = get(&app, &format!("/api/books/{}/stages", book_id)).await;
    assert_eq!(status, StatusCode::OK);
    let stages = stages.as_array().unwrap().clone();
    assert_eq!(stages.len(), 11);
    assert!(stages.iter().all(|s| s["status"] == "PENDING"));
    assert_eq!(stages[0]["stage_type"], "MANUSCRIPT_RECEIVED");

    // Author-facing view shows only the first stage initially
    let (status, visible) =
        get(&app, &format!("/api/books/{}/stages?visible_only=true", book_id)).await;
    assert_eq!(status, StatusCode::OK);
    let visible = visible.as_array().unwrap().clone();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0]["stage_type"], "MANUSCRIPT_RECEIVED");
}

#[tokio::test]
async fn stage_lock_workflow_over_http() {
    let app = setup_app().await;
    let (_, book_id) = create_author_and_book(&app).await;

    let (_, stages) = get(&app, &format!("/api/books/{}/stages", book_id)).await;
    let stage_id = stages[1]["id"].as_str().unwrap().to_string();
    let base = format!("/api/books/{}/stages/{}", book_id, stage_id);

    // Approve: locks the stage and stamps completion
    let (status, approved) =
        make_request(&app, Method::PATCH, &base, Some(json!({ "status": "APPROVED" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["is_locked"], true);
    assert!(!approved["completed_at"].is_null());

    // Locked stage rejects a status edit with 409
    let (status, err) =
        make_request(&app, Method::PATCH, &base, Some(json!({ "status": "IN_PROGRESS" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "CONFLICT");

    // Unlock, then reopening clears the completion stamp
    let (status, unlocked) = post(&app, &format!("{}/unlock", base), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unlocked["is_locked"], false);

    let (status, reopened) =
        make_request(&app, Method::PATCH, &base, Some(json!({ "status": "IN_PROGRESS" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["status"], "IN_PROGRESS");
    assert!(reopened["completed_at"].is_null());

    // History recorded every accepted change, attributed to the actor
    let (status, history) = get(&app, &format!("{}/history", base)).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap().clone();
    assert!(history.len() >= 3);
    assert!(history.iter().all(|h| h["changed_by"] == "test-admin"));
}

#[tokio::test]
async fn duplicate_stage_type_conflicts() {
    let app = setup_app().await;
    let (_, book_id) = create_author_and_book(&app).await;

    // Seeding already created every fixed type
    let (status, err) = post(
        &app,
        &format!("/api/books/{}/stages", book_id),
        json!({ "stage_type": "COVER_DESIGN" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn royalty_generation_requires_config() {
    let app = setup_app().await;
    let (author_id, book_id) = create_author_and_book(&app).await;

    // No config yet: 409 with remedy text
    let (status, err) = post(
        &app,
        "/api/royalties/generate",
        json!({ "book_id": book_id, "platform": "amazon", "quantity": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "CONFIG_MISSING");
    let message = err["error"]["message"].as_str().unwrap();
    assert!(message.contains("configure a royalty amount"));

    let (status, _) = make_request(
        &app,
        Method::PUT,
        &format!("/api/books/{}/royalty-config", book_id),
        Some(json!({ "platform": "amazon", "royalty_amount": 42.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, generated) = post(
        &app,
        "/api/royalties/generate",
        json!({ "book_id": book_id, "platform": "amazon", "quantity": 5, "period": "2026-08" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(generated["royalty_per_unit"], 42.0);
    assert_eq!(generated["total_royalty"], 210.0);
    let royalties = generated["royalties"].as_array().unwrap().clone();
    // Single-author book: one row holding the full amount
    assert_eq!(royalties.len(), 1);
    assert_eq!(royalties[0]["author_id"], author_id.as_str());
    assert_eq!(royalties[0]["amount"], 210.0);
    assert_eq!(royalties[0]["bucket"], "ECOMMERCE");
    assert_eq!(royalties[0]["period"], "2026-08");
}

#[tokio::test]
async fn payout_marks_paid_and_notifies_author() {
    let app = setup_app().await;
    let (author_id, book_id) = create_author_and_book(&app).await;

    make_request(
        &app,
        Method::PUT,
        &format!("/api/books/{}/royalty-config", book_id),
        Some(json!({ "platform": "website", "royalty_amount": 10.0 })),
    )
    .await;
    let (_, generated) = post(
        &app,
        "/api/royalties/generate",
        json!({ "book_id": book_id, "platform": "website", "quantity": 3 }),
    )
    .await;
    let royalty_id = generated["royalties"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(generated["royalties"][0]["bucket"], "WEBSITE");

    let unpaid_path = format!("/api/authors/{}/royalties/unpaid", author_id);
    let (_, unpaid) = get(&app, &unpaid_path).await;
    assert_eq!(unpaid.as_array().unwrap().len(), 1);

    let (status, summary) = post(
        &app,
        "/api/royalties/mark-paid",
        json!({ "royalty_ids": [royalty_id], "payment_ref": "UTR-123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["updated_count"], 1);
    assert_eq!(summary["notified_author_count"], 1);

    let (_, unpaid) = get(&app, &unpaid_path).await;
    assert!(unpaid.as_array().unwrap().is_empty());

    let (status, notifications) =
        get(&app, &format!("/api/authors/{}/notifications", author_id)).await;
    assert_eq!(status, StatusCode::OK);
    let notifications = notifications.as_array().unwrap().clone();
    assert_eq!(notifications.len(), 1);
    let message = notifications[0]["message"].as_str().unwrap();
    assert!(message.contains("30.00"));
    assert!(message.contains("First Book"));
    assert!(message.contains("UTR-123"));
}

#[tokio::test]
async fn user_import_from_raw_csv() {
    let app = setup_app().await;

    let csv = "email,name\nalice@press.example,Alice\nbob@press.example,Bob\nalice@press.example,Alice Again\n";
    let (status, report) = post(&app, "/api/imports/users/execute", json!({ "csv": csv })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["success_count"], 2);
    // Third row duplicates the first within the same batch
    assert_eq!(report["skipped_count"], 1);
    assert_eq!(report["error_count"], 0);
    assert!(report["batch_id"].is_string());

    let (status, batches) = get(&app, "/api/imports").await;
    assert_eq!(status, StatusCode::OK);
    let batches = batches.as_array().unwrap().clone();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0]["import_type"], "users");
    assert_eq!(batches[0]["total_rows"], 3);

    let (status, err) = post(&app, "/api/imports/payments/execute", json!({ "csv": csv })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn sales_import_with_column_mapping_generates_royalties() {
    let app = setup_app().await;

    let (_, author2) = post(
        &app,
        "/api/authors",
        json!({ "email": "second@press.example", "name": "Second Author" }),
    )
    .await;
    let (status, book) = post(
        &app,
        "/api/books",
        json!({
            "title": "Sellable",
            "author": author2["id"],
            "isbn_paperback": "978-1-0000-0002-2"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let sellable_id = book["id"].as_str().unwrap();
    make_request(
        &app,
        Method::PUT,
        &format!("/api/books/{}/royalty-config", sellable_id),
        Some(json!({ "platform": "AMAZON", "royalty_amount": 15.0 })),
    )
    .await;

    let csv = "ISBN,Channel,Gross,Units\n978-1-0000-0002-2,AMAZON,300,2\n";
    let mapping = json!({
        "ISBN": "isbn",
        "Channel": "platform",
        "Gross": "amount",
        "Units": "quantity"
    });

    let (status, report) = post(
        &app,
        "/api/imports/sales/validate",
        json!({ "csv": csv, "mapping": mapping }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["valid_count"], 1);

    let (status, report) = post(
        &app,
        "/api/imports/sales/execute",
        json!({ "csv": csv, "mapping": mapping }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["success_count"], 1);
    assert_eq!(report["royalties_generated"], 1);

    let (_, unpaid) = get(
        &app,
        &format!("/api/authors/{}/royalties/unpaid", author2["id"].as_str().unwrap()),
    )
    .await;
    let unpaid = unpaid.as_array().unwrap().clone();
    assert_eq!(unpaid.len(), 1);
    // 15.0 per unit x 2 units
    assert_eq!(unpaid[0]["amount"], 30.0);
}

#[tokio::test]
async fn lead_pipeline_over_http() {
    let app = setup_app().await;

    let (status, lead) = post(
        &app,
        "/api/leads",
        json!({ "name": "Prospect Press", "email": "prospect@press.example" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lead["status"], "NEW");
    let lead_id = lead["id"].as_str().unwrap().to_string();
    let status_path = format!("/api/leads/{}/status", lead_id);

    let (status, _) =
        make_request(&app, Method::PATCH, &status_path, Some(json!({ "status": "CONTACTED" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, converted) =
        make_request(&app, Method::PATCH, &status_path, Some(json!({ "status": "CONVERTED" }))).await;
    let stamp = converted["converted_at"].as_str().unwrap().to_string();

    // LOST afterwards keeps the conversion stamp
    let (_, lost) =
        make_request(&app, Method::PATCH, &status_path, Some(json!({ "status": "LOST" }))).await;
    assert_eq!(lost["status"], "LOST");
    assert_eq!(lost["converted_at"].as_str().unwrap(), stamp);

    let (status, history) = get(&app, &format!("/api/leads/{}/history", lead_id)).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap().clone();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["from_status"], "NEW");
    assert_eq!(history[2]["to_status"], "LOST");

    let (status, note) = post(
        &app,
        &format!("/api/leads/{}/notes", lead_id),
        json!({ "body": "Sent the catalogue" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["created_by"], "test-admin");

    // Status filter on the listing
    let (_, lost_leads) = get(&app, "/api/leads?status=lost").await;
    assert_eq!(lost_leads.as_array().unwrap().len(), 1);
    let (_, new_leads) = get(&app, "/api/leads?status=NEW").await;
    assert!(new_leads.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn settings_roundtrip() {
    let app = setup_app().await;

    let (status, mut settings) = get(&app, "/api/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["royalties"]["order_royalty_rate"], 0.10);

    settings["general"]["site_name"] = json!("Acme Press");
    settings["royalties"]["order_royalty_rate"] = json!(0.12);
    let (status, saved) = make_request(&app, Method::PUT, "/api/settings", Some(settings)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["general"]["site_name"], "Acme Press");

    let (_, reloaded) = get(&app, "/api/settings").await;
    assert_eq!(reloaded["general"]["site_name"], "Acme Press");
    assert_eq!(reloaded["royalties"]["order_royalty_rate"], 0.12);

    // Order royalty uses the updated flat rate
    let (_, author) = post(
        &app,
        "/api/authors",
        json!({ "email": "rate@press.example", "name": "Rate Author" }),
    )
    .await;
    let (_, book) = post(
        &app,
        "/api/books",
        json!({ "title": "Rated", "author": author["id"] }),
    )
    .await;
    let (status, royalty) = post(
        &app,
        "/api/royalties/orders",
        json!({ "book_id": book["id"], "sale_amount": 500.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(royalty["amount"], 60.0);
    assert_eq!(royalty["bucket"], "WEBSITE");
}
