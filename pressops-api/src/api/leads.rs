//! Lead endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use pressops_common::db::models::{Lead, LeadNote, LeadStageHistory};
use serde::Deserialize;

use crate::api::Actor;
use crate::db::leads as db;
use crate::services::leads;
use crate::{ApiError, ApiResult, AppState};

pub fn lead_routes() -> Router<AppState> {
    Router::new()
        .route("/api/leads", post(create_lead))
        .route("/api/leads", get(list_leads))
        .route("/api/leads/:lead_id", get(get_lead))
        .route("/api/leads/:lead_id/status", patch(update_status))
        .route("/api/leads/:lead_id/notes", post(add_note))
        .route("/api/leads/:lead_id/notes", get(list_notes))
        .route("/api/leads/:lead_id/history", get(lead_history))
}

async fn create_lead(
    State(state): State<AppState>,
    Json(req): Json<leads::NewLead>,
) -> ApiResult<(StatusCode, Json<Lead>)> {
    let lead = leads::create_lead(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

#[derive(Debug, Default, Deserialize)]
struct ListLeadsQuery {
    status: Option<String>,
}

async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<ListLeadsQuery>,
) -> ApiResult<Json<Vec<Lead>>> {
    let status = query.status.as_ref().map(|s| s.trim().to_uppercase());
    let list = db::list_leads(&state.db, status.as_deref()).await?;
    Ok(Json(list))
}

async fn get_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> ApiResult<Json<Lead>> {
    let lead = db::get_lead(&state.db, &lead_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No lead '{}'", lead_id)))?;
    Ok(Json(lead))
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: String,
}

async fn update_status(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
    actor: Actor,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<Lead>> {
    let lead = leads::update_lead_status(&state.db, &lead_id, &req.status, &actor.0).await?;
    Ok(Json(lead))
}

#[derive(Debug, Deserialize)]
struct NoteRequest {
    body: String,
}

async fn add_note(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
    actor: Actor,
    Json(req): Json<NoteRequest>,
) -> ApiResult<(StatusCode, Json<LeadNote>)> {
    let note = leads::add_note(&state.db, &lead_id, &req.body, &actor.0).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn list_notes(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> ApiResult<Json<Vec<LeadNote>>> {
    let notes = db::list_notes(&state.db, &lead_id).await?;
    Ok(Json(notes))
}

async fn lead_history(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> ApiResult<Json<Vec<LeadStageHistory>>> {
    let history = db::list_stage_history(&state.db, &lead_id).await?;
    Ok(Json(history))
}
