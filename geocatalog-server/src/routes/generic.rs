//! `/v1/geo_objects/{object_type}` routes keyed by registry type.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    routing::get,
};
use geocatalog_core::{EntityType, GeoObject, resolve};

use super::{Pagination, json_body, object_id, route_both};
use crate::{error::ApiError, state::AppState};

pub(super) fn routes(router: Router<AppState>) -> Router<AppState> {
    let router = route_both(
        router,
        "/v1/geo_objects/:object_type",
        get(list_objects).post(create_object),
    );
    route_both(
        router,
        "/v1/geo_objects/:object_type/:object_id",
        get(get_object).put(update_object).delete(remove_object),
    )
}

fn entity(object_type: &str) -> Result<&'static EntityType, ApiError> {
    resolve(object_type).map_err(|err| ApiError::Store(err.into()))
}

async fn create_object(
    State(state): State<AppState>,
    Path(object_type): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<GeoObject>), ApiError> {
    let key = entity(&object_type)?.key();
    let payload = json_body(&body)?;
    let created = state
        .with_store(move |store| store.create(key, &payload))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_objects(
    State(state): State<AppState>,
    Path(object_type): Path<String>,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<Vec<GeoObject>>, ApiError> {
    let key = entity(&object_type)?.key();
    let Query(page) = query.map_err(|err| ApiError::unprocessable("query", err.body_text()))?;
    let objects = state
        .with_store(move |store| store.list(key, page.skip, page.limit))
        .await?;
    Ok(Json(objects))
}

async fn get_object(
    State(state): State<AppState>,
    Path((object_type, raw_id)): Path<(String, String)>,
) -> Result<Json<GeoObject>, ApiError> {
    let key = entity(&object_type)?.key();
    let id = object_id(&raw_id)?;
    let object = state.with_store(move |store| store.get(key, id)).await?;
    Ok(Json(object))
}

async fn update_object(
    State(state): State<AppState>,
    Path((object_type, raw_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<GeoObject>, ApiError> {
    let key = entity(&object_type)?.key();
    let id = object_id(&raw_id)?;
    let payload = json_body(&body)?;
    let updated = state
        .with_store(move |store| store.update(key, id, &payload))
        .await?;
    Ok(Json(updated))
}

async fn remove_object(
    State(state): State<AppState>,
    Path((object_type, raw_id)): Path<(String, String)>,
) -> Result<Json<GeoObject>, ApiError> {
    let key = entity(&object_type)?.key();
    let id = object_id(&raw_id)?;
    let removed = state.with_store(move |store| store.remove(key, id)).await?;
    Ok(Json(removed))
}
