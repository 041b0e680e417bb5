//! Payload builders shared by unit, behaviour and HTTP tests.

use geojson::JsonValue;
use serde_json::json;

use crate::registry::EntityKind;

/// GeoJSON point at `(lon, lat)`.
#[must_use]
pub fn point(lon: f64, lat: f64) -> JsonValue {
    json!({"type": "Point", "coordinates": [lon, lat]})
}

/// GeoJSON multi-polygon holding one axis-aligned square.
#[must_use]
pub fn square(min_x: f64, min_y: f64, size: f64) -> JsonValue {
    let (max_x, max_y) = (min_x + size, min_y + size);
    json!({
        "type": "MultiPolygon",
        "coordinates": [[[
            [min_x, min_y],
            [max_x, min_y],
            [max_x, max_y],
            [min_x, max_y],
            [min_x, min_y],
        ]]],
    })
}

/// GeoJSON multi-line-string with a single two-point segment.
#[must_use]
pub fn segment(from: (f64, f64), to: (f64, f64)) -> JsonValue {
    json!({
        "type": "MultiLineString",
        "coordinates": [[[from.0, from.1], [to.0, to.1]]],
    })
}

/// A valid Create payload for a street with the given identity.
#[must_use]
pub fn street_payload(id: i64) -> JsonValue {
    json!({
        "id": id,
        "st_name": "Tverskaya",
        "road_categ": "main",
        "properties_data": {"source": "test"},
        "geometry": segment((37.60, 55.76), (37.61, 55.77)),
    })
}

/// A valid Create payload for any entity type.
///
/// Streets get identity `1`; use [`street_payload`] to choose another.
#[must_use]
pub fn create_payload(kind: EntityKind) -> JsonValue {
    match kind {
        EntityKind::Districts => json!({
            "name": "Arbat",
            "name_ao": "CAO",
            "properties_data": {"population": 35000},
            "geometry": square(37.58, 55.74, 0.02),
        }),
        EntityKind::Streets => street_payload(1),
        EntityKind::Stations => json!({
            "name_station": "Smolenskaya",
            "name_line": "Arbatsko-Pokrovskaya",
            "station_type": "metro",
            "geometry": point(37.58, 55.75),
        }),
        EntityKind::BusStops => json!({
            "name_mpv": "Arbatskaya ploshchad",
            "rayon": "Arbat",
            "ao": "CAO",
            "geometry": point(37.60, 55.75),
        }),
        EntityKind::CustomObjects => json!({
            "name": "Bench",
            "description": "Green bench by the fountain",
            "object_type": "furniture",
            "geometry": point(37.59, 55.75),
        }),
    }
}
