//! HTTP API
//!
//! One module per resource; each exposes a `*_routes()` function merged
//! into the application router in `lib.rs`. Handlers stay thin: extract,
//! call a service or db function, serialize.

pub mod authors;
pub mod books;
pub mod health;
pub mod imports;
pub mod leads;
pub mod royalties;
pub mod settings;
pub mod stages;

pub use authors::author_routes;
pub use books::book_routes;
pub use health::health_routes;
pub use imports::import_routes;
pub use leads::lead_routes;
pub use royalties::royalty_routes;
pub use settings::settings_routes;
pub use stages::stage_routes;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Who is making the change, for history attribution.
///
/// Taken from the `X-Actor-Id` header; mutations made without one are
/// attributed to `system`. Authentication itself sits in front of this
/// service.
#[derive(Debug, Clone)]
pub struct Actor(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-actor-id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("system");
        Ok(Actor(id.to_string()))
    }
}
