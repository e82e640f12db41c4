//! Publishing-stage endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use pressops_common::db::models::{PublishingStage, StageHistoryEntry, StageType};
use serde::Deserialize;
use serde_json::json;

use crate::api::Actor;
use crate::db::stages as db;
use crate::services::stages;
use crate::{ApiError, ApiResult, AppState};

pub fn stage_routes() -> Router<AppState> {
    Router::new()
        .route("/api/books/:book_id/stages", get(list_stages))
        .route("/api/books/:book_id/stages", post(create_stage))
        .route("/api/books/:book_id/stages/:stage_id", patch(update_stage))
        .route("/api/books/:book_id/stages/:stage_id", delete(remove_stage))
        .route("/api/books/:book_id/stages/:stage_id/unlock", post(unlock_stage))
        .route("/api/books/:book_id/stages/:stage_id/history", get(stage_history))
}

#[derive(Debug, Default, Deserialize)]
struct ListStagesQuery {
    /// Author-facing view: hidden stages omitted
    #[serde(default)]
    visible_only: bool,
}

async fn list_stages(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Query(query): Query<ListStagesQuery>,
) -> ApiResult<Json<Vec<PublishingStage>>> {
    crate::db::books::get_book(&state.db, &book_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No book '{}'", book_id)))?;
    let list = db::list_stages(&state.db, &book_id, query.visible_only).await?;
    Ok(Json(list))
}

#[derive(Debug, Deserialize)]
struct CreateStageRequest {
    stage_type: String,
}

async fn create_stage(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Json(req): Json<CreateStageRequest>,
) -> ApiResult<(StatusCode, Json<PublishingStage>)> {
    let stage_type = StageType::parse(&req.stage_type)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown stage type: '{}'", req.stage_type)))?;
    let stage = stages::create_stage(&state.db, &book_id, stage_type).await?;
    Ok((StatusCode::CREATED, Json(stage)))
}

async fn update_stage(
    State(state): State<AppState>,
    Path((book_id, stage_id)): Path<(String, String)>,
    actor: Actor,
    Json(patch): Json<stages::StagePatch>,
) -> ApiResult<Json<PublishingStage>> {
    let stage = stages::update_stage(&state.db, &book_id, &stage_id, patch, &actor.0).await?;
    Ok(Json(stage))
}

async fn remove_stage(
    State(state): State<AppState>,
    Path((book_id, stage_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    stages::remove_stage(&state.db, &book_id, &stage_id).await?;
    Ok(Json(json!({ "deleted": stage_id })))
}

async fn unlock_stage(
    State(state): State<AppState>,
    Path((book_id, stage_id)): Path<(String, String)>,
    actor: Actor,
) -> ApiResult<Json<PublishingStage>> {
    let stage = stages::unlock_stage(&state.db, &book_id, &stage_id, &actor.0).await?;
    Ok(Json(stage))
}

async fn stage_history(
    State(state): State<AppState>,
    Path((book_id, stage_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<StageHistoryEntry>>> {
    // 404 for a stage id that is not on this book
    db::get_stage(&state.db, &book_id, &stage_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No stage '{}' on book '{}'", stage_id, book_id)))?;
    let history = db::list_history(&state.db, &stage_id).await?;
    Ok(Json(history))
}
