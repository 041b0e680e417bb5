//! Route table for the catalog API.

use axum::{Json, Router, body::Bytes, routing::get};
use serde_json::{Value, json};
use serde::Deserialize;

use crate::{config::ServerConfig, error::ApiError, state::AppState};

mod generic;
mod typed;

/// Page size used when the query omits `limit`.
pub const DEFAULT_LIMIT: u64 = 100;

/// `skip`/`limit` query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub(crate) struct Pagination {
    skip: u64,
    limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Parse an object id taken from the path.
fn object_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::unprocessable("object_id", format!("{raw:?} is not an integer")))
}

/// Decode a request body as JSON; shape checks are left to the store.
fn json_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::unprocessable("body", err))
}

/// Register `path` and its trailing-slash twin with the same handlers.
fn route_both(
    router: Router<AppState>,
    path: &str,
    method_router: axum::routing::MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path, method_router.clone())
        .route(&format!("{path}/"), method_router)
}

fn api_routes() -> Router<AppState> {
    let router = generic::routes(Router::new());
    let router = typed::routes::<geocatalog_core::District>(router);
    let router = typed::routes::<geocatalog_core::Street>(router);
    let router = typed::routes::<geocatalog_core::Station>(router);
    typed::routes::<geocatalog_core::BusStop>(router)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Build the application router.
///
/// `/health` is always served at the root; the catalog routes are nested
/// under the configured API prefix.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let api = api_routes();
    let api = if config.api_prefix().is_empty() {
        api
    } else {
        Router::new().nest(config.api_prefix(), api)
    };
    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", Some(42))]
    #[case("-3", Some(-3))]
    #[case("4.2", None)]
    #[case("abc", None)]
    fn parses_object_ids(#[case] raw: &str, #[case] expected: Option<i64>) {
        assert_eq!(object_id(raw).ok(), expected);
    }
}
