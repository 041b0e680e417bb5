//! Per-type routes answering with compile-time typed projections.
//!
//! Request bodies are validated by the same registry rules as the generic
//! routes, so a rejected payload lists every failing field.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    routing::get,
};
use geocatalog_core::GeoEntity;

use super::{Pagination, json_body, object_id, route_both};
use crate::{error::ApiError, state::AppState};

/// Mount `/v1/{key}` and `/v1/{key}/{object_id}` for `E`.
pub(super) fn routes<E: GeoEntity>(router: Router<AppState>) -> Router<AppState> {
    let base = format!("/v1/{}", E::KIND.key());
    let router = route_both(router, &base, get(list::<E>).post(create::<E>));
    route_both(
        router,
        &format!("{base}/:object_id"),
        get(fetch::<E>).put(update::<E>).delete(remove::<E>),
    )
}

async fn create<E: GeoEntity>(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<E>), ApiError> {
    let payload = json_body(&body)?;
    let created = state
        .with_store(move |store| store.create_as::<E>(&payload))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list<E: GeoEntity>(
    State(state): State<AppState>,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<Vec<E>>, ApiError> {
    let Query(page) = query.map_err(|err| ApiError::unprocessable("query", err.body_text()))?;
    let objects = state
        .with_store(move |store| store.list_typed::<E>(page.skip, page.limit))
        .await?;
    Ok(Json(objects))
}

async fn fetch<E: GeoEntity>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<E>, ApiError> {
    let id = object_id(&raw_id)?;
    let object = state
        .with_store(move |store| store.get_typed::<E>(id))
        .await?;
    Ok(Json(object))
}

async fn update<E: GeoEntity>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<E>, ApiError> {
    let id = object_id(&raw_id)?;
    let payload = json_body(&body)?;
    let updated = state
        .with_store(move |store| store.update_as::<E>(id, &payload))
        .await?;
    Ok(Json(updated))
}

async fn remove<E: GeoEntity>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<E>, ApiError> {
    let id = object_id(&raw_id)?;
    let removed = state
        .with_store(move |store| store.remove_typed::<E>(id))
        .await?;
    Ok(Json(removed))
}
