//! End-to-end tests of the HTTP surface using in-process requests.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use geocatalog_core::{
    EntityKind, GeoStore,
    test_support::{create_payload, point, street_payload},
};
use geocatalog_server::{AppState, ServerConfig, router};
use http_body_util::BodyExt;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

struct Api {
    _dir: TempDir,
    app: Router,
}

impl Api {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |json| Body::from(json.to_string())))
            .expect("build request");
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON response body")
        };
        (status, json)
    }

    async fn create(&self, kind: EntityKind, body: Value) -> Value {
        let (status, created) = self
            .send(Method::POST, &format!("/v1/geo_objects/{}/", kind.key()), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
        created
    }
}

fn api_with(config: &ServerConfig) -> Api {
    let dir = TempDir::new().expect("create temp dir");
    let store = GeoStore::open(dir.path().join("catalog.db")).expect("open store");
    Api {
        app: router(AppState::new(store), config),
        _dir: dir,
    }
}

#[fixture]
fn api() -> Api {
    api_with(&ServerConfig::default())
}

fn id_of(object: &Value) -> i64 {
    object["id"].as_i64().expect("object carries an integer id")
}

fn violated_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .expect("violation list")
        .iter()
        .filter_map(|violation| violation["field"].as_str())
        .map(str::to_owned)
        .collect()
}

/// Flatten nested coordinate arrays into `f64` values.
fn coordinates(value: &Value) -> Vec<f64> {
    match value {
        Value::Array(items) => items.iter().flat_map(coordinates).collect(),
        other => other.as_f64().into_iter().collect(),
    }
}

#[rstest]
#[tokio::test]
async fn health_reports_ok(api: Api) {
    let (status, body) = api.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[rstest]
#[tokio::test]
async fn created_station_reads_back_unchanged(api: Api) {
    let created = api
        .create(EntityKind::Stations, create_payload(EntityKind::Stations))
        .await;
    let (status, fetched) = api
        .send(Method::GET, &format!("/v1/geo_objects/stations/{}", id_of(&created)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    assert_eq!(fetched["name_station"], "Smolenskaya");
    assert_eq!(fetched["geometry"], point(37.58, 55.75));
}

#[rstest]
#[tokio::test]
async fn unknown_type_is_not_found(api: Api) {
    let (status, body) = api
        .send(Method::POST, "/v1/geo_objects/unicorns/", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().expect("detail").contains("unicorns"));
}

#[rstest]
#[tokio::test]
async fn duplicate_street_conflicts(api: Api) {
    api.create(EntityKind::Streets, street_payload(42)).await;
    let (status, body) = api
        .send(Method::POST, "/v1/geo_objects/streets/", Some(street_payload(42)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].is_string());
    let (_, listed) = api.send(Method::GET, "/v1/geo_objects/streets/", None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[rstest]
#[tokio::test]
async fn invalid_payload_lists_every_violation(api: Api) {
    let (status, body) = api
        .send(
            Method::POST,
            "/v1/geo_objects/districts/",
            Some(json!({"name": "Arbat", "geometry": point(0.0, 0.0)})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .expect("violation list")
        .iter()
        .filter_map(|violation| violation["field"].as_str())
        .collect();
    assert!(fields.contains(&"geometry"), "got {fields:?}");
    assert!(fields.contains(&"name_ao"), "got {fields:?}");
}

#[rstest]
#[tokio::test]
async fn typed_invalid_payload_lists_every_violation(api: Api) {
    let (status, body) = api.send(Method::POST, "/v1/districts/", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(violated_fields(&body), vec!["geometry", "name", "name_ao"]);

    let (_, generic) = api
        .send(Method::POST, "/v1/geo_objects/districts/", Some(json!({})))
        .await;
    assert_eq!(body, generic);
}

#[rstest]
#[tokio::test]
async fn typed_update_reports_every_violation(api: Api) {
    let created = api
        .create(EntityKind::Stations, create_payload(EntityKind::Stations))
        .await;
    let (status, body) = api
        .send(
            Method::PUT,
            &format!("/v1/stations/{}", id_of(&created)),
            Some(json!({
                "name_station": 5,
                "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(violated_fields(&body), vec!["geometry", "name_station"]);
}

#[rstest]
#[tokio::test]
async fn district_with_integer_coordinates_reads_back_numerically_equal(api: Api) {
    let posted = json!({
        "name": "Central",
        "name_ao": "North",
        "geometry": {
            "type": "MultiPolygon",
            "coordinates": [[[[0, 0], [0, 1], [1, 1], [1, 0], [0, 0]]]],
        },
    });
    let created = api.create(EntityKind::Districts, posted.clone()).await;
    assert!(created["id"].is_i64(), "got {created}");
    let (status, fetched) = api
        .send(Method::GET, &format!("/v1/geo_objects/districts/{}", id_of(&created)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["geometry"]["type"], "MultiPolygon");
    assert_eq!(
        coordinates(&fetched["geometry"]["coordinates"]),
        coordinates(&posted["geometry"]["coordinates"])
    );
}

#[rstest]
#[tokio::test]
async fn malformed_json_is_unprocessable(api: Api) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/geo_objects/stations/")
        .body(Body::from("{not json"))
        .expect("build request");
    let response = api.app.clone().oneshot(request).await.expect("router");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[rstest]
#[tokio::test]
async fn partial_update_keeps_other_fields(api: Api) {
    let created = api
        .create(EntityKind::BusStops, create_payload(EntityKind::BusStops))
        .await;
    let uri = format!("/v1/geo_objects/bus_stops/{}/", id_of(&created));
    let (status, updated) = api
        .send(Method::PUT, &uri, Some(json!({"name_mpv": "Novy Arbat"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name_mpv"], "Novy Arbat");
    assert_eq!(updated["rayon"], created["rayon"]);
    assert_eq!(updated["geometry"], created["geometry"]);
}

#[rstest]
#[tokio::test]
async fn update_of_missing_object_is_not_found(api: Api) {
    let (status, _) = api
        .send(
            Method::PUT,
            "/v1/geo_objects/stations/999",
            Some(json!({"name_station": "Ghost"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn deleted_object_is_gone(api: Api) {
    let created = api
        .create(EntityKind::CustomObjects, create_payload(EntityKind::CustomObjects))
        .await;
    let uri = format!("/v1/geo_objects/custom_objects/{}", id_of(&created));
    let (status, removed) = api.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed, created);
    let (status, _) = api.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn list_honours_skip_and_limit(api: Api) {
    for name in ["a", "b", "c"] {
        api.create(
            EntityKind::Stations,
            json!({"name_station": name, "geometry": point(37.0, 55.0)}),
        )
        .await;
    }
    let (status, page) = api
        .send(Method::GET, "/v1/geo_objects/stations?skip=1&limit=1", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = page
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|object| object["name_station"].as_str())
        .collect();
    assert_eq!(names, vec!["b"]);

    let (_, all) = api.send(Method::GET, "/v1/geo_objects/stations/", None).await;
    assert_eq!(all.as_array().map(Vec::len), Some(3));
}

#[rstest]
#[case("/v1/geo_objects/stations?limit=-1")]
#[case("/v1/geo_objects/stations/abc")]
#[case("/v1/stations/1.5")]
#[tokio::test]
async fn undecodable_requests_are_unprocessable(api: Api, #[case] uri: &str) {
    let (status, body) = api.send(Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[rstest]
#[tokio::test]
async fn typed_district_routes_share_storage(api: Api) {
    let (status, created) = api
        .send(
            Method::POST,
            "/v1/districts/",
            Some(create_payload(EntityKind::Districts)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "typed create failed: {created}");
    let id = id_of(&created);

    let (status, generic) = api
        .send(Method::GET, &format!("/v1/geo_objects/districts/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(generic["name"], created["name"]);

    let (status, updated) = api
        .send(
            Method::PUT,
            &format!("/v1/districts/{id}"),
            Some(json!({"name_ao": "ZAO"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name_ao"], "ZAO");
    assert_eq!(updated["name"], created["name"]);

    let (status, _) = api
        .send(Method::DELETE, &format!("/v1/districts/{id}/"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[rstest]
#[tokio::test]
async fn typed_street_create_requires_id(api: Api) {
    let mut payload = street_payload(7);
    payload
        .as_object_mut()
        .expect("object payload")
        .remove("id");
    let (status, _) = api.send(Method::POST, "/v1/streets", Some(payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[rstest]
#[tokio::test]
async fn api_prefix_moves_catalog_routes() {
    let config = ServerConfig::default()
        .with_api_prefix("/api")
        .expect("valid prefix");
    let api = api_with(&config);
    let (status, _) = api.send(Method::GET, "/api/v1/geo_objects/stations/", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = api.send(Method::GET, "/v1/geo_objects/stations/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = api.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}
