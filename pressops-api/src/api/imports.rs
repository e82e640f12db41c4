//! Bulk import endpoints
//!
//! The request body carries either pre-parsed `rows` or raw `csv` text
//! (rows win when both are present), plus an optional column-to-field
//! `mapping`. Validate is a dry run; execute writes and persists a
//! batch summary.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use pressops_common::db::models::ImportBatch;
use serde::Deserialize;

use crate::db::imports as db;
use crate::services::import::{self, ImportType, Mapping, Row};
use crate::{ApiError, ApiResult, AppState};

pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/api/imports/:import_type/validate", post(validate))
        .route("/api/imports/:import_type/execute", post(execute))
        .route("/api/imports", get(list_batches))
}

#[derive(Debug, Default, Deserialize)]
struct ImportRequest {
    #[serde(default)]
    rows: Option<Vec<Row>>,
    #[serde(default)]
    csv: Option<String>,
    #[serde(default)]
    mapping: Mapping,
}

impl ImportRequest {
    fn into_rows(self) -> Result<(Vec<Row>, Mapping), ApiError> {
        let rows = match (self.rows, self.csv) {
            (Some(rows), _) => rows,
            (None, Some(text)) => import::parse_csv(&text)?,
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "Provide either 'rows' or 'csv'".to_string(),
                ))
            }
        };
        Ok((rows, self.mapping))
    }
}

fn parse_type(s: &str) -> Result<ImportType, ApiError> {
    ImportType::parse(s)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown import type: '{}'", s)))
}

async fn validate(
    State(state): State<AppState>,
    Path(import_type): Path<String>,
    Json(req): Json<ImportRequest>,
) -> ApiResult<Json<import::ValidationReport>> {
    let import_type = parse_type(&import_type)?;
    let (rows, mapping) = req.into_rows()?;
    let report = import::validate(&state.db, import_type, &rows, &mapping).await?;
    Ok(Json(report))
}

async fn execute(
    State(state): State<AppState>,
    Path(import_type): Path<String>,
    Json(req): Json<ImportRequest>,
) -> ApiResult<Json<import::ExecutionReport>> {
    let import_type = parse_type(&import_type)?;
    let (rows, mapping) = req.into_rows()?;
    let report = import::execute(&state.db, import_type, &rows, &mapping).await?;
    Ok(Json(report))
}

async fn list_batches(State(state): State<AppState>) -> ApiResult<Json<Vec<ImportBatch>>> {
    let batches = db::list_batches(&state.db).await?;
    Ok(Json(batches))
}
