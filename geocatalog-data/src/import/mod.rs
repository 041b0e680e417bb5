//! One-shot import of GeoJSON layers into the catalog store.
//!
//! [`run_import`] provisions the schema, clears every entity table and then
//! loads each [`SourceSpec`] in order. Each source is staged in memory and
//! committed as one batch. Sources fail independently: a missing file, a
//! malformed document or a rejected batch is logged and recorded in the
//! [`ImportReport`] while the remaining sources still load.

use camino::Utf8Path;
use geocatalog_core::{
    BulkWriter, GeoObjectError, GeoStore, GeometryFormatError, GeometryKind, StagedRow, geometry,
};
use geojson::{JsonValue, Value};
use log::{debug, info, warn};
use thiserror::Error;

mod mappers;
mod report;
mod source;

pub use mappers::{BUS_STOPS, DISTRICTS, FieldRule, PropertyMapping, STATIONS, STREETS};
pub use report::{ImportReport, SourceOutcome, SourceReport};

use source::read_features;

/// Data directory used when none is configured.
pub const DEFAULT_DATA_DIR: &str = "../geoData";

/// A source file and the mapping that turns its features into rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// File name resolved against the data directory.
    pub file: String,
    /// Property mapping for the file's features.
    pub mapping: PropertyMapping,
}

impl SourceSpec {
    /// Pair `file` with `mapping`.
    #[must_use]
    pub fn new(file: impl Into<String>, mapping: PropertyMapping) -> Self {
        Self {
            file: file.into(),
            mapping,
        }
    }
}

/// The layers shipped with the catalog's open data bundle.
#[must_use]
pub fn default_sources() -> Vec<SourceSpec> {
    [
        ("bus_tram_stops.geojson", BUS_STOPS),
        ("districts_layer.geojson", DISTRICTS),
        ("mcd_station.geojson", STATIONS),
        ("mck_station.geojson", STATIONS),
        ("metro_station.geojson", STATIONS),
        ("StreetsPedestrian.geojson", STREETS),
    ]
    .into_iter()
    .map(|(file, mapping)| SourceSpec::new(file, mapping))
    .collect()
}

/// Failure that aborts the whole import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The store could not be prepared for loading.
    #[error("failed to {step} before import")]
    Store {
        /// Preparation step that failed.
        step: &'static str,
        /// Underlying store error.
        #[source]
        source: GeoObjectError,
    },
}

fn store_step(step: &'static str) -> impl FnOnce(GeoObjectError) -> ImportError {
    move |source| ImportError::Store { step, source }
}

/// Replace the store's contents with the features of `sources`.
///
/// # Errors
///
/// Returns [`ImportError`] when the schema cannot be provisioned or the
/// tables cannot be cleared. Per-source failures are reported in the
/// returned [`ImportReport`] instead.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use geocatalog_core::GeoStore;
/// use geocatalog_data::{SourceOutcome, default_sources, run_import};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let store = GeoStore::open(dir.path().join("catalog.db"))?;
/// let data_dir = Utf8Path::from_path(dir.path()).ok_or("non-UTF-8 temp dir")?;
/// let report = run_import(&store, data_dir, &default_sources())?;
/// assert!(report
///     .sources
///     .iter()
///     .all(|source| source.outcome == SourceOutcome::Missing));
/// # Ok(())
/// # }
/// ```
pub fn run_import(
    store: &GeoStore,
    data_dir: &Utf8Path,
    sources: &[SourceSpec],
) -> Result<ImportReport, ImportError> {
    store.provision().map_err(store_step("provision schema"))?;
    let mut writer = store.bulk_writer().map_err(store_step("open writer"))?;
    let rows_cleared = writer.clear_all().map_err(store_step("clear tables"))?;

    let sources = sources
        .iter()
        .map(|spec| load_source(&mut writer, data_dir, spec))
        .collect();
    let report = ImportReport {
        rows_cleared,
        sources,
    };
    info!(
        "import finished: {} rows from {} sources",
        report.rows_committed(),
        report.sources.len()
    );
    Ok(report)
}

fn load_source(writer: &mut BulkWriter, data_dir: &Utf8Path, spec: &SourceSpec) -> SourceReport {
    let path = data_dir.join(&spec.file);
    let entity = spec.mapping.entity_type();
    let mut report = SourceReport::pending(&spec.file, entity.kind);

    let features = match read_features(&path) {
        Ok(features) => features,
        Err(err) => {
            warn!("skipping source {path}: {err}");
            report.outcome = err.outcome();
            return report;
        }
    };
    report.features_read = features.len();

    let mut rows = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        match stage_feature(feature, &spec.mapping) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => {
                debug!("{path}: feature {index} lacks properties or geometry");
                report.features_skipped += 1;
            }
            Err(err) => {
                warn!("{path}: feature {index} has an unusable geometry: {err}");
                report.features_skipped += 1;
            }
        }
    }

    if rows.is_empty() {
        info!("{path}: no rows to load");
        report.outcome = SourceOutcome::Empty;
        return report;
    }
    match writer.insert_batch(entity, &rows) {
        Ok(committed) => {
            info!("{path}: loaded {committed} {} rows", entity.key());
            report.rows_committed = committed;
            report.outcome = SourceOutcome::Loaded;
        }
        Err(err) => {
            warn!("{path}: batch rolled back: {err}");
            report.outcome = SourceOutcome::Failed;
        }
    }
    report
}

/// Turn one feature into a staged row.
///
/// Returns `Ok(None)` for features without a non-empty properties object or
/// without a geometry.
fn stage_feature(
    feature: &JsonValue,
    mapping: &PropertyMapping,
) -> Result<Option<StagedRow>, GeometryFormatError> {
    let properties = feature
        .get("properties")
        .and_then(JsonValue::as_object)
        .filter(|properties| !properties.is_empty());
    let raw_geometry = feature.get("geometry").filter(|geometry| !is_blank(geometry));
    let (Some(properties), Some(raw_geometry)) = (properties, raw_geometry) else {
        return Ok(None);
    };

    let kind = mapping.entity_type().geometry;
    let mut parsed = geometry::parse(raw_geometry)?;
    parsed.value = promote(kind, parsed.value);
    let stored = geometry::encode_as(kind, &parsed)?;
    Ok(Some(StagedRow {
        geometry: stored,
        fields: mapping.apply(properties),
        properties: Some(properties.clone()),
    }))
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Wrap single-part layers into the multi-part kind their table stores.
fn promote(kind: GeometryKind, value: Value) -> Value {
    match (kind, value) {
        (GeometryKind::MultiPolygon, Value::Polygon(rings)) => Value::MultiPolygon(vec![rings]),
        (GeometryKind::MultiLineString, Value::LineString(line)) => {
            Value::MultiLineString(vec![line])
        }
        (_, value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocatalog_core::{EntityKind, ScalarValue, test_support::point};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn stages_feature_with_verbatim_properties() {
        let feature = json!({
            "type": "Feature",
            "properties": {"name_station": "Tushinskaya", "extra": [1, 2]},
            "geometry": point(37.43, 55.82),
        });
        let row = stage_feature(&feature, &STATIONS)
            .expect("encode")
            .expect("staged row");
        assert_eq!(row.geometry.srid(), Some(geometry::SRID));
        assert_eq!(
            row.properties.map(JsonValue::Object),
            feature.get("properties").cloned()
        );
        assert!(row
            .fields
            .contains(&("station_type", ScalarValue::from("unknown"))));
    }

    #[rstest]
    #[case(json!({"properties": {}, "geometry": point(0.0, 0.0)}))]
    #[case(json!({"geometry": point(0.0, 0.0)}))]
    #[case(json!({"properties": {"name_station": "A"}, "geometry": null}))]
    #[case(json!({"properties": {"name_station": "A"}, "geometry": {}}))]
    #[case(json!({"properties": {"name_station": "A"}}))]
    fn skips_incomplete_features(#[case] feature: JsonValue) {
        assert_eq!(stage_feature(&feature, &STATIONS).expect("no error"), None);
    }

    #[rstest]
    fn rejects_foreign_geometry_kind() {
        let feature = json!({
            "properties": {"ST_NAME": "Arbat"},
            "geometry": point(0.0, 0.0),
        });
        let err = stage_feature(&feature, &STREETS).expect_err("point is not a street");
        assert!(matches!(err, GeometryFormatError::KindMismatch { .. }));
    }

    #[rstest]
    fn promotes_single_part_street() {
        let feature = json!({
            "properties": {"ST_NAME": "Arbat"},
            "geometry": {"type": "LineString", "coordinates": [[37.58, 55.75], [37.59, 55.75]]},
        });
        let row = stage_feature(&feature, &STREETS)
            .expect("encode")
            .expect("staged row");
        let decoded = geometry::decode(Some(&row.geometry))
            .expect("decode")
            .expect("geometry");
        assert!(matches!(decoded.value, Value::MultiLineString(ref lines) if lines.len() == 1));
    }

    #[rstest]
    fn default_sources_cover_every_imported_type() {
        let sources = default_sources();
        assert_eq!(sources.len(), 6);
        for kind in [
            EntityKind::BusStops,
            EntityKind::Districts,
            EntityKind::Stations,
            EntityKind::Streets,
        ] {
            assert!(sources.iter().any(|source| source.mapping.kind == kind));
        }
        assert!(!sources
            .iter()
            .any(|source| source.mapping.kind == EntityKind::CustomObjects));
    }
}
