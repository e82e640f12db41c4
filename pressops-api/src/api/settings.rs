//! Site settings endpoints
//!
//! The whole settings document is read and replaced as a unit; partial
//! category updates are a client-side merge.

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use pressops_common::settings::SiteSettings;

use crate::{ApiResult, AppState};

pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings).put(put_settings))
}

async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SiteSettings>> {
    let settings = SiteSettings::load(&state.db).await?;
    Ok(Json(settings))
}

async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<SiteSettings>,
) -> ApiResult<Json<SiteSettings>> {
    settings.save(&state.db).await?;
    Ok(Json(settings))
}
