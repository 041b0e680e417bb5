//! GeoJSON layer builders for import tests.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use geocatalog_core::test_support::{point, segment, square};
use serde_json::{Value, json};
use tempfile::TempDir;

/// UTF-8 view of a temporary directory.
pub fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir {path:?} is not UTF-8"))
}

/// A GeoJSON feature with the given properties and geometry.
pub fn feature(properties: Value, geometry: Value) -> Value {
    json!({"type": "Feature", "properties": properties, "geometry": geometry})
}

/// Write a feature collection to `dir/file`.
pub fn write_layer(dir: &Utf8Path, file: &str, features: Vec<Value>) {
    let collection = json!({"type": "FeatureCollection", "features": features});
    write_raw(dir, file, &collection.to_string());
}

/// Write arbitrary text to `dir/file`.
pub fn write_raw(dir: &Utf8Path, file: &str, contents: &str) {
    let path = dir.join(file);
    fs::write(&path, contents).unwrap_or_else(|err| panic!("failed to write {path}: {err}"));
}

/// Bus stop feature with the given `fid`.
pub fn stop(fid: i64, name: &str) -> Value {
    feature(
        json!({"fid": fid, "name_mpv": name, "rayon": "Arbat", "marshrut": "15; 31"}),
        point(37.60, 55.75),
    )
}

/// District feature named `name`.
pub fn district(fid: i64, name: &str) -> Value {
    feature(
        json!({"fid": fid, "NAME": name, "NAME_AO": "CAO"}),
        square(37.58, 55.74, 0.02),
    )
}

/// Station feature named `name`.
pub fn station(name: &str, kind: &str) -> Value {
    feature(
        json!({"name_station": name, "name_line": "Line 1", "type": kind}),
        point(37.58, 55.75),
    )
}

/// Street feature with the given `fid`.
pub fn street(fid: i64) -> Value {
    feature(
        json!({"fid": fid, "ST_NAME": "Arbat", "ROAD_CATEG": "pedestrian"}),
        segment((37.58, 55.75), (37.59, 55.75)),
    )
}
