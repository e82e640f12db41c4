//! Royalty endpoints
//!
//! Generation returns 409 CONFIG_MISSING (with remedy text) when the
//! (book, platform) pair has no usable per-unit amount configured.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use pressops_common::db::models::Royalty;
use serde::Deserialize;

use crate::db::royalties as db;
use crate::services::{identity, royalty};
use crate::{ApiError, ApiResult, AppState};

pub fn royalty_routes() -> Router<AppState> {
    Router::new()
        .route("/api/royalties/generate", post(generate))
        .route("/api/royalties/mark-paid", post(mark_paid))
        .route("/api/royalties/orders", post(record_order))
        .route("/api/authors/:identifier/royalties/unpaid", get(unpaid_for_author))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    book_id: String,
    platform: String,
    quantity: i64,
    /// YYYY-MM; defaults to the current month
    period: Option<String>,
    sale_id: Option<String>,
}

async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<(StatusCode, Json<royalty::GeneratedRoyalties>)> {
    let generated = royalty::generate_royalty(
        &state.db,
        &req.book_id,
        &req.platform,
        req.quantity,
        req.period,
        req.sale_id.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(generated)))
}

#[derive(Debug, Deserialize)]
struct MarkPaidRequest {
    royalty_ids: Vec<String>,
    payment_ref: String,
}

async fn mark_paid(
    State(state): State<AppState>,
    Json(req): Json<MarkPaidRequest>,
) -> ApiResult<Json<royalty::PayoutSummary>> {
    if req.royalty_ids.is_empty() {
        return Err(ApiError::BadRequest("royalty_ids must not be empty".to_string()));
    }
    if req.payment_ref.trim().is_empty() {
        return Err(ApiError::BadRequest("payment_ref is required".to_string()));
    }
    let summary =
        royalty::mark_royalties_paid(&state.db, &req.royalty_ids, req.payment_ref.trim()).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct OrderRoyaltyRequest {
    book_id: String,
    sale_amount: f64,
    #[serde(default = "default_quantity")]
    quantity: i64,
    sale_id: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

/// Storefront-order fallback: flat-rate royalty to the primary author.
async fn record_order(
    State(state): State<AppState>,
    Json(req): Json<OrderRoyaltyRequest>,
) -> ApiResult<(StatusCode, Json<Royalty>)> {
    let royalty = royalty::record_order_royalty(
        &state.db,
        &req.book_id,
        req.sale_amount,
        req.quantity,
        req.sale_id.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(royalty)))
}

async fn unpaid_for_author(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<Vec<Royalty>>> {
    let author = identity::resolve_author(&state.db, &identifier).await?;
    let list = db::list_unpaid_for_author(&state.db, &author.id).await?;
    Ok(Json(list))
}
