//! pressops-api - Publishing Operations backend
//!
//! JSON-over-HTTP service for the publishing back office: author
//! identity, publishing-stage workflow, royalty generation/payout,
//! bulk CSV import, and the lead pipeline.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pressops_api::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting pressops-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Database path: PRESSOPS_DB env var, else ./data/pressops.db
    let db_path = std::env::var("PRESSOPS_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/pressops.db"));
    info!("Database: {}", db_path.display());

    let db_pool = pressops_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    let state = AppState::new(db_pool);
    let app = pressops_api::build_router(state);

    let bind_addr =
        std::env::var("PRESSOPS_BIND").unwrap_or_else(|_| "127.0.0.1:5730".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
