//! Integration tests for `run_import` against scratch data directories.

use camino::Utf8PathBuf;
use geocatalog_core::{EntityKind, GeoStore, ScalarValue};
use geocatalog_data::{STREETS, SourceOutcome, SourceSpec, run_import};
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

#[expect(dead_code, reason = "support exports layer builders not all used here")]
mod support;

use support::{feature, street, utf8_dir, write_layer};

struct Scratch {
    dir: TempDir,
    store: GeoStore,
}

impl Scratch {
    fn data_dir(&self) -> Utf8PathBuf {
        utf8_dir(&self.dir)
    }
}

#[fixture]
fn scratch() -> Scratch {
    let dir = TempDir::new().expect("create temp dir");
    let store = GeoStore::open(dir.path().join("catalog.db")).expect("open store");
    Scratch { dir, store }
}

fn streets_only() -> Vec<SourceSpec> {
    vec![SourceSpec::new("streets.geojson", STREETS)]
}

#[rstest]
fn streets_receive_store_ids_and_keep_source_properties(scratch: Scratch) {
    write_layer(&scratch.data_dir(), "streets.geojson", vec![street(40), street(41)]);
    let report = run_import(&scratch.store, &scratch.data_dir(), &streets_only()).expect("import");
    assert_eq!(report.committed_for(EntityKind::Streets), 2);

    let streets = scratch.store.list("streets", 0, 10).expect("list streets");
    let fids: Vec<_> = streets
        .iter()
        .filter_map(|object| object.field("fid").and_then(ScalarValue::as_integer))
        .collect();
    assert_eq!(fids, vec![40, 41]);
    let first = &streets[0];
    assert_eq!(first.field("st_name"), Some(&ScalarValue::from("Arbat")));
    let properties = first.properties().expect("source properties kept");
    assert_eq!(properties.get("ROAD_CATEG"), Some(&json!("pedestrian")));
}

#[rstest]
fn rerunning_replaces_previous_rows(scratch: Scratch) {
    write_layer(&scratch.data_dir(), "streets.geojson", vec![street(1), street(2)]);
    run_import(&scratch.store, &scratch.data_dir(), &streets_only()).expect("first import");
    let second =
        run_import(&scratch.store, &scratch.data_dir(), &streets_only()).expect("second import");
    assert_eq!(second.rows_cleared, 2);
    assert_eq!(scratch.store.list("streets", 0, 10).expect("list").len(), 2);
}

#[rstest]
fn unusable_geometry_skips_only_that_feature(scratch: Scratch) {
    write_layer(
        &scratch.data_dir(),
        "streets.geojson",
        vec![
            street(1),
            feature(
                json!({"ST_NAME": "Broken"}),
                json!({"type": "MultiLineString", "coordinates": [[[37.0]]]}),
            ),
            feature(
                json!({"ST_NAME": "Pointy"}),
                json!({"type": "Point", "coordinates": [37.0, 55.0]}),
            ),
        ],
    );
    let report = run_import(&scratch.store, &scratch.data_dir(), &streets_only()).expect("import");
    let streets = report.source("streets.geojson").expect("street layer in report");
    assert_eq!(streets.features_read, 3);
    assert_eq!(streets.features_skipped, 2);
    assert_eq!(streets.rows_committed, 1);
    assert_eq!(streets.outcome, SourceOutcome::Loaded);
}

#[rstest]
fn missing_data_directory_reports_every_source_missing(scratch: Scratch) {
    let absent = scratch.data_dir().join("nowhere");
    let report = run_import(&scratch.store, &absent, &streets_only()).expect("import");
    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].outcome, SourceOutcome::Missing);
    assert_eq!(report.rows_committed(), 0);
}
