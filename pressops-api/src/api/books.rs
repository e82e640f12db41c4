//! Book endpoints
//!
//! Creating a book resolves its author by any identifier and seeds the
//! full publishing-stage sequence in the same request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use pressops_common::db::models::{Book, BookRoyaltyConfig, BookStatus};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db::{books, royalties};
use crate::services::{identity, stages};
use crate::{ApiError, ApiResult, AppState};

pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/api/books", post(create_book))
        .route("/api/books/:book_id", get(get_book))
        .route("/api/books/:book_id/royalty-config", put(put_royalty_config))
        .route("/api/books/:book_id/co-authors", post(add_co_author))
}

#[derive(Debug, Deserialize)]
struct CreateBookRequest {
    title: String,
    /// Internal id, author UID, or email
    author: String,
    isbn_paperback: Option<String>,
    isbn_hardcover: Option<String>,
    isbn_ebook: Option<String>,
    price_paperback: Option<f64>,
    price_hardcover: Option<f64>,
    price_ebook: Option<f64>,
}

async fn create_book(
    State(state): State<AppState>,
    Json(req): Json<CreateBookRequest>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    let author = identity::resolve_author(&state.db, &req.author).await?;

    if let Some(isbn) = &req.isbn_paperback {
        if books::paperback_isbn_exists(&state.db, isbn).await? {
            return Err(ApiError::Conflict(format!("ISBN already exists: {}", isbn)));
        }
    }

    let now = Utc::now();
    let book = Book {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        author_id: author.id,
        status: BookStatus::Draft.as_str().to_string(),
        isbn_paperback: req.isbn_paperback,
        isbn_hardcover: req.isbn_hardcover,
        isbn_ebook: req.isbn_ebook,
        price_paperback: req.price_paperback,
        price_hardcover: req.price_hardcover,
        price_ebook: req.price_ebook,
        is_listed: true,
        created_at: now,
        updated_at: now,
    };
    books::insert_book(&state.db, &book).await?;
    stages::seed_stages(&state.db, &book.id).await?;

    tracing::info!(book_id = %book.id, title = %book.title, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Book>> {
    let book = books::get_book(&state.db, &book_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No book '{}'", book_id)))?;
    Ok(Json(book))
}

#[derive(Debug, Deserialize)]
struct RoyaltyConfigRequest {
    platform: String,
    royalty_amount: f64,
}

/// Set the per-unit royalty amount for a (book, platform) pair.
async fn put_royalty_config(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Json(req): Json<RoyaltyConfigRequest>,
) -> ApiResult<Json<BookRoyaltyConfig>> {
    if req.royalty_amount < 0.0 {
        return Err(ApiError::BadRequest(format!(
            "Royalty amount must be non-negative, got {}",
            req.royalty_amount
        )));
    }
    books::get_book(&state.db, &book_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No book '{}'", book_id)))?;

    let config =
        royalties::upsert_config(&state.db, &book_id, &req.platform, req.royalty_amount).await?;
    Ok(Json(config))
}

#[derive(Debug, Deserialize)]
struct CoAuthorRequest {
    /// Internal id, author UID, or email
    author: String,
    /// Ownership percentage 0-100; null means an equal split
    share: Option<f64>,
}

async fn add_co_author(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Json(req): Json<CoAuthorRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if let Some(share) = req.share {
        if !(0.0..=100.0).contains(&share) {
            return Err(ApiError::BadRequest(format!(
                "Share must be between 0 and 100, got {}",
                share
            )));
        }
    }
    books::get_book(&state.db, &book_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No book '{}'", book_id)))?;
    let author = identity::resolve_author(&state.db, &req.author).await?;

    books::add_co_author(&state.db, &book_id, &author.id, req.share).await?;
    Ok(Json(json!({
        "book_id": book_id,
        "user_id": author.id,
        "share": req.share,
    })))
}
