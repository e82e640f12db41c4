//! Author endpoints
//!
//! The `:identifier` path segment accepts an internal id, an author UID,
//! or an email; resolution tries them in that order.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use pressops_common::db::models::{Notification, User, UserRole};
use serde::Deserialize;
use serde_json::json;

use crate::db::{notifications, users};
use crate::services::identity;
use crate::{ApiError, ApiResult, AppState};

pub fn author_routes() -> Router<AppState> {
    Router::new()
        .route("/api/authors", post(create_author))
        .route("/api/authors/:identifier", get(get_author))
        .route("/api/authors/:identifier", delete(deactivate_author))
        .route("/api/authors/:identifier/uid", post(ensure_uid))
        .route("/api/authors/:identifier/notifications", get(list_notifications))
}

#[derive(Debug, Deserialize)]
struct CreateAuthorRequest {
    email: String,
    name: String,
    role: Option<String>,
}

async fn create_author(
    State(state): State<AppState>,
    Json(req): Json<CreateAuthorRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let role = UserRole::parse_or_author(req.role.as_deref().unwrap_or(""));
    let user = identity::create_author(&state.db, &req.email, &req.name, role).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_author(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<User>> {
    let user = identity::resolve_author(&state.db, &identifier).await?;
    Ok(Json(user))
}

/// Soft delete. The row stays for royalty and history attribution.
async fn deactivate_author(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = identity::resolve_author(&state.db, &identifier).await?;
    let deactivated = users::deactivate_user(&state.db, &user.id).await?;
    if !deactivated {
        return Err(ApiError::NotFound(format!("No user '{}'", user.id)));
    }
    Ok(Json(json!({ "id": user.id, "is_active": false })))
}

/// Returns the author's UID, generating and persisting one if absent.
async fn ensure_uid(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = identity::resolve_author(&state.db, &identifier).await?;
    let uid = identity::ensure_author_uid(&state.db, &user).await?;
    Ok(Json(json!({ "id": user.id, "author_uid": uid })))
}

async fn list_notifications(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<Vec<Notification>>> {
    let user = identity::resolve_author(&state.db, &identifier).await?;
    let list = notifications::list_for_user(&state.db, &user.id).await?;
    Ok(Json(list))
}
