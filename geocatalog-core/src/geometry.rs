//! Geometry transcoding between the GeoJSON exchange format and stored EWKB.
//!
//! Every persisted geometry is an EWKB blob tagged with [`SRID`]. Only the
//! three kinds used by the catalog are accepted, and coordinate structures are
//! checked strictly enough that `decode(encode(g)) == g` holds for every value
//! [`encode`] accepts. No topology repair or reprojection takes place.

use std::fmt;

use geo::{BoundingRect, Rect};
use geojson::{Geometry as GeoJsonGeometry, JsonValue, Value as GeoJsonValue};
use geozero::{CoordDimensions, ToGeo, ToWkb, wkb::Ewkb};
use thiserror::Error;

/// Spatial reference identifier carried by every stored geometry (WGS84).
pub const SRID: i32 = 4326;

/// Bit set in the EWKB type word when an SRID follows the header.
const EWKB_SRID_FLAG: u32 = 0x2000_0000;

/// Geometry kinds the catalog persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// A single position.
    Point,
    /// One or more line strings.
    MultiLineString,
    /// One or more polygons.
    MultiPolygon,
}

impl GeometryKind {
    /// Return the GeoJSON `type` tag for this kind.
    #[must_use]
    pub const fn geojson_type(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
        }
    }

    fn of(value: &GeoJsonValue) -> Result<Self, GeometryFormatError> {
        match value {
            GeoJsonValue::Point(_) => Ok(Self::Point),
            GeoJsonValue::MultiLineString(_) => Ok(Self::MultiLineString),
            GeoJsonValue::MultiPolygon(_) => Ok(Self::MultiPolygon),
            other => Err(GeometryFormatError::UnsupportedKind {
                found: value_type_name(other),
            }),
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.geojson_type())
    }
}

/// Errors raised while converting geometries in either direction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeometryFormatError {
    /// The payload was not a GeoJSON geometry object.
    #[error("geometry is not a valid GeoJSON geometry: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
    },
    /// The GeoJSON `type` tag names a kind the catalog does not store.
    #[error("unsupported geometry type {found}; expected Point, MultiLineString or MultiPolygon")]
    UnsupportedKind {
        /// Tag found in the payload.
        found: &'static str,
    },
    /// The geometry kind differs from the one the entity type stores.
    #[error("expected a {expected} geometry but received {found}")]
    KindMismatch {
        /// Kind declared by the entity type.
        expected: GeometryKind,
        /// Kind found in the payload.
        found: GeometryKind,
    },
    /// A coordinate structure breaks the accepted shape.
    #[error("{path}: {reason}")]
    InvalidCoordinates {
        /// Location of the offending array, such as `coordinates[0][2]`.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// Stored bytes carried no spatial reference.
    #[error("stored geometry carries no SRID")]
    MissingSrid,
    /// Stored bytes used a spatial reference other than [`SRID`].
    #[error("stored geometry uses SRID {found}, expected {expected}")]
    UnexpectedSrid {
        /// SRID read from the EWKB header.
        found: i32,
        /// SRID the store requires.
        expected: i32,
    },
    /// Writing EWKB failed.
    #[error("failed to encode geometry: {message}")]
    Encode {
        /// Encoder diagnostic.
        message: String,
    },
    /// Reading EWKB failed.
    #[error("failed to decode stored geometry: {message}")]
    Decode {
        /// Decoder diagnostic.
        message: String,
    },
}

/// Geometry as persisted by the store: an EWKB blob tagged with [`SRID`].
#[derive(Clone, PartialEq, Eq)]
pub struct StoreGeometry(Vec<u8>);

impl StoreGeometry {
    /// Wrap raw EWKB bytes read from the store.
    ///
    /// The bytes are not inspected here; [`decode`] validates them.
    #[must_use]
    pub const fn from_ewkb(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the EWKB bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Read the SRID from the EWKB header, if the header declares one.
    #[must_use]
    pub fn srid(&self) -> Option<i32> {
        read_srid(&self.0)
    }
}

impl fmt::Debug for StoreGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreGeometry")
            .field("bytes", &self.0.len())
            .field("srid", &self.srid())
            .finish()
    }
}

/// Parse a JSON value into a GeoJSON geometry without checking its kind.
///
/// # Errors
///
/// Returns [`GeometryFormatError::Malformed`] when the value is not a GeoJSON
/// geometry object.
pub fn parse(value: &JsonValue) -> Result<GeoJsonGeometry, GeometryFormatError> {
    GeoJsonGeometry::try_from(value.clone()).map_err(|err| GeometryFormatError::Malformed {
        message: err.to_string(),
    })
}

/// Encode a GeoJSON geometry as EWKB tagged with [`SRID`].
///
/// # Errors
///
/// Fails when the geometry kind is unsupported, a coordinate structure is
/// malformed, or the encoder rejects the shape.
///
/// # Examples
///
/// ```
/// use geocatalog_core::geometry::{SRID, decode, encode};
/// use geojson::{Geometry, Value};
///
/// # fn main() -> Result<(), geocatalog_core::geometry::GeometryFormatError> {
/// let point = Geometry::new(Value::Point(vec![37.6, 55.7]));
/// let stored = encode(&point)?;
/// assert_eq!(stored.srid(), Some(SRID));
/// assert_eq!(decode(Some(&stored))?, Some(point));
/// # Ok(())
/// # }
/// ```
pub fn encode(geometry: &GeoJsonGeometry) -> Result<StoreGeometry, GeometryFormatError> {
    GeometryKind::of(&geometry.value)?;
    validate_coordinates(&geometry.value)?;

    let shape = geo_types::Geometry::<f64>::try_from(geometry.value.clone()).map_err(|err| {
        GeometryFormatError::Malformed {
            message: err.to_string(),
        }
    })?;
    let bytes = shape
        .to_ewkb(CoordDimensions::xy(), Some(SRID))
        .map_err(|err| GeometryFormatError::Encode {
            message: err.to_string(),
        })?;
    Ok(StoreGeometry(bytes))
}

/// Encode a geometry that must be of the given kind.
///
/// # Errors
///
/// Returns [`GeometryFormatError::KindMismatch`] when the kinds differ, and
/// any error [`encode`] raises.
pub fn encode_as(
    kind: GeometryKind,
    geometry: &GeoJsonGeometry,
) -> Result<StoreGeometry, GeometryFormatError> {
    let found = GeometryKind::of(&geometry.value)?;
    if found != kind {
        return Err(GeometryFormatError::KindMismatch {
            expected: kind,
            found,
        });
    }
    encode(geometry)
}

/// Decode a stored geometry back into GeoJSON.
///
/// An absent value decodes to `None`. Coordinates are stored as doubles, so
/// integer input such as `[0, 1]` comes back as `[0.0, 1.0]`: numerically
/// equal, though not byte-equal JSON.
///
/// # Errors
///
/// Fails when the bytes carry no SRID, a foreign SRID, or cannot be parsed.
pub fn decode(
    stored: Option<&StoreGeometry>,
) -> Result<Option<GeoJsonGeometry>, GeometryFormatError> {
    let Some(stored) = stored else {
        return Ok(None);
    };
    let shape = to_shape(stored)?;
    Ok(Some(GeoJsonGeometry::new(GeoJsonValue::from(&shape))))
}

/// Compute the envelope used for the spatial index.
///
/// Empty collections have no envelope and yield `None`.
///
/// # Errors
///
/// Fails under the same conditions as [`decode`].
pub fn bounding_box(stored: &StoreGeometry) -> Result<Option<Rect<f64>>, GeometryFormatError> {
    Ok(to_shape(stored)?.bounding_rect())
}

fn to_shape(stored: &StoreGeometry) -> Result<geo_types::Geometry<f64>, GeometryFormatError> {
    match stored.srid() {
        Some(SRID) => {}
        Some(found) => {
            return Err(GeometryFormatError::UnexpectedSrid {
                found,
                expected: SRID,
            });
        }
        None => return Err(GeometryFormatError::MissingSrid),
    }
    Ewkb(stored.as_bytes().to_vec())
        .to_geo()
        .map_err(|err| GeometryFormatError::Decode {
            message: err.to_string(),
        })
}

fn read_srid(bytes: &[u8]) -> Option<i32> {
    let (&order, rest) = bytes.split_first()?;
    let word = |range: std::ops::Range<usize>| -> Option<u32> {
        let raw: [u8; 4] = rest.get(range)?.try_into().ok()?;
        Some(if order == 0 {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        })
    };
    let geometry_type = word(0..4)?;
    if geometry_type & EWKB_SRID_FLAG == 0 {
        return None;
    }
    i32::try_from(word(4..8)?).ok()
}

fn value_type_name(value: &GeoJsonValue) -> &'static str {
    match value {
        GeoJsonValue::Point(_) => "Point",
        GeoJsonValue::MultiPoint(_) => "MultiPoint",
        GeoJsonValue::LineString(_) => "LineString",
        GeoJsonValue::MultiLineString(_) => "MultiLineString",
        GeoJsonValue::Polygon(_) => "Polygon",
        GeoJsonValue::MultiPolygon(_) => "MultiPolygon",
        GeoJsonValue::GeometryCollection(_) => "GeometryCollection",
    }
}

fn validate_coordinates(value: &GeoJsonValue) -> Result<(), GeometryFormatError> {
    match value {
        GeoJsonValue::Point(position) => check_position(position, "coordinates"),
        GeoJsonValue::MultiLineString(lines) => {
            for (line_index, line) in lines.iter().enumerate() {
                let path = format!("coordinates[{line_index}]");
                if line.len() < 2 {
                    return Err(invalid(path, "a line string needs at least two positions"));
                }
                check_positions(line, &path)?;
            }
            Ok(())
        }
        GeoJsonValue::MultiPolygon(polygons) => {
            for (polygon_index, polygon) in polygons.iter().enumerate() {
                let path = format!("coordinates[{polygon_index}]");
                if polygon.is_empty() {
                    return Err(invalid(path, "a polygon needs an exterior ring"));
                }
                for (ring_index, ring) in polygon.iter().enumerate() {
                    check_ring(ring, &format!("{path}[{ring_index}]"))?;
                }
            }
            Ok(())
        }
        other => Err(GeometryFormatError::UnsupportedKind {
            found: value_type_name(other),
        }),
    }
}

fn check_ring(ring: &[Vec<f64>], path: &str) -> Result<(), GeometryFormatError> {
    if ring.len() < 4 {
        return Err(invalid(path.to_owned(), "a ring needs at least four positions"));
    }
    check_positions(ring, path)?;
    if ring.first() != ring.last() {
        return Err(invalid(path.to_owned(), "a ring must be closed"));
    }
    Ok(())
}

fn check_positions(positions: &[Vec<f64>], path: &str) -> Result<(), GeometryFormatError> {
    positions
        .iter()
        .enumerate()
        .try_for_each(|(index, position)| check_position(position, &format!("{path}[{index}]")))
}

fn check_position(position: &[f64], path: &str) -> Result<(), GeometryFormatError> {
    if position.len() != 2 {
        return Err(invalid(
            path.to_owned(),
            "a position needs exactly two coordinates",
        ));
    }
    if !position.iter().all(|coordinate| coordinate.is_finite()) {
        return Err(invalid(path.to_owned(), "coordinates must be finite numbers"));
    }
    Ok(())
}

fn invalid(path: String, reason: &'static str) -> GeometryFormatError {
    GeometryFormatError::InvalidCoordinates { path, reason }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the geometry transcoder.

    use super::*;
    use geojson::Value;
    use rstest::rstest;
    use serde_json::json;

    fn square() -> Vec<Vec<Vec<f64>>> {
        vec![vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
        ]]
    }

    #[rstest]
    #[case::point(Value::Point(vec![37.617, 55.755]))]
    #[case::multi_line_string(Value::MultiLineString(vec![
        vec![vec![37.0, 55.0], vec![37.1, 55.1]],
        vec![vec![37.2, 55.2], vec![37.3, 55.3], vec![37.4, 55.2]],
    ]))]
    #[case::multi_polygon(Value::MultiPolygon(vec![square()]))]
    #[case::multi_polygon_with_hole(Value::MultiPolygon(vec![vec![
        vec![vec![0.0, 0.0], vec![4.0, 0.0], vec![4.0, 4.0], vec![0.0, 4.0], vec![0.0, 0.0]],
        vec![vec![1.0, 1.0], vec![2.0, 1.0], vec![2.0, 2.0], vec![1.0, 1.0]],
    ]]))]
    fn round_trips_supported_kinds(#[case] value: Value) {
        let geometry = GeoJsonGeometry::new(value);
        let stored = encode(&geometry).expect("encode geometry");
        assert_eq!(stored.srid(), Some(SRID));
        let decoded = decode(Some(&stored)).expect("decode geometry");
        assert_eq!(decoded, Some(geometry));
    }

    #[rstest]
    fn self_intersecting_polygon_passes_unchanged() {
        let bowtie = Value::MultiPolygon(vec![vec![vec![
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
        ]]]);
        let geometry = GeoJsonGeometry::new(bowtie);
        let stored = encode(&geometry).expect("encode bowtie");
        assert_eq!(decode(Some(&stored)).expect("decode"), Some(geometry));
    }

    #[rstest]
    fn absent_geometry_decodes_to_none() {
        assert_eq!(decode(None).expect("decode absent"), None);
    }

    #[rstest]
    #[case::polygon(json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}), "Polygon")]
    #[case::line_string(json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]}), "LineString")]
    #[case::multi_point(json!({"type": "MultiPoint", "coordinates": [[0, 0]]}), "MultiPoint")]
    fn rejects_unsupported_kinds(#[case] payload: JsonValue, #[case] tag: &str) {
        let geometry = parse(&payload).expect("parse GeoJSON");
        let err = encode(&geometry).expect_err("kind should be rejected");
        assert!(
            matches!(err, GeometryFormatError::UnsupportedKind { found } if found == tag),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    #[case::unknown_tag(json!({"type": "Circle", "coordinates": [0, 0]}))]
    #[case::not_an_object(json!([1, 2]))]
    #[case::missing_coordinates(json!({"type": "Point"}))]
    fn rejects_malformed_payloads(#[case] payload: JsonValue) {
        let err = parse(&payload).expect_err("payload should be rejected");
        assert!(matches!(err, GeometryFormatError::Malformed { .. }));
    }

    #[rstest]
    #[case::three_dimensions(Value::Point(vec![1.0, 2.0, 3.0]), "coordinates")]
    #[case::one_dimension(Value::Point(vec![1.0]), "coordinates")]
    #[case::short_line(Value::MultiLineString(vec![vec![vec![0.0, 0.0]]]), "coordinates[0]")]
    #[case::open_ring(
        Value::MultiPolygon(vec![vec![vec![
            vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 1.0],
        ]]]),
        "coordinates[0][0]"
    )]
    #[case::short_ring(
        Value::MultiPolygon(vec![vec![vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 0.0]]]]),
        "coordinates[0][0]"
    )]
    #[case::empty_polygon(Value::MultiPolygon(vec![vec![]]), "coordinates[0]")]
    fn rejects_malformed_coordinates(#[case] value: Value, #[case] expected_path: &str) {
        let err = encode(&GeoJsonGeometry::new(value)).expect_err("coordinates should be rejected");
        match err {
            GeometryFormatError::InvalidCoordinates { path, .. } => assert_eq!(path, expected_path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    fn rejects_non_finite_coordinates() {
        let geometry = GeoJsonGeometry::new(Value::Point(vec![f64::NAN, 0.0]));
        assert!(matches!(
            encode(&geometry),
            Err(GeometryFormatError::InvalidCoordinates { .. })
        ));
    }

    #[rstest]
    fn encode_as_rejects_kind_mismatch() {
        let geometry = GeoJsonGeometry::new(Value::Point(vec![0.0, 0.0]));
        let err = encode_as(GeometryKind::MultiPolygon, &geometry).expect_err("mismatch");
        assert_eq!(
            err,
            GeometryFormatError::KindMismatch {
                expected: GeometryKind::MultiPolygon,
                found: GeometryKind::Point,
            }
        );
    }

    #[rstest]
    fn decode_rejects_missing_srid() {
        let shape = geo_types::Geometry::Point(geo_types::Point::new(1.0, 2.0));
        let bytes = shape
            .to_ewkb(CoordDimensions::xy(), None)
            .expect("encode without SRID");
        let err = decode(Some(&StoreGeometry::from_ewkb(bytes))).expect_err("missing SRID");
        assert_eq!(err, GeometryFormatError::MissingSrid);
    }

    #[rstest]
    fn decode_rejects_foreign_srid() {
        let shape = geo_types::Geometry::Point(geo_types::Point::new(1.0, 2.0));
        let bytes = shape
            .to_ewkb(CoordDimensions::xy(), Some(3857))
            .expect("encode with foreign SRID");
        let stored = StoreGeometry::from_ewkb(bytes);
        assert_eq!(stored.srid(), Some(3857));
        let err = decode(Some(&stored)).expect_err("foreign SRID");
        assert_eq!(
            err,
            GeometryFormatError::UnexpectedSrid {
                found: 3857,
                expected: SRID,
            }
        );
    }

    #[rstest]
    fn srid_is_absent_for_truncated_bytes() {
        assert_eq!(StoreGeometry::from_ewkb(vec![1, 1]).srid(), None);
    }

    #[rstest]
    fn bounding_box_spans_all_parts() {
        let lines = GeoJsonGeometry::new(Value::MultiLineString(vec![
            vec![vec![-1.0, 2.0], vec![0.0, 3.0]],
            vec![vec![4.0, -5.0], vec![2.0, 0.0]],
        ]));
        let stored = encode(&lines).expect("encode lines");
        let envelope = bounding_box(&stored)
            .expect("read envelope")
            .expect("non-empty envelope");
        assert_eq!(envelope.min().x, -1.0);
        assert_eq!(envelope.min().y, -5.0);
        assert_eq!(envelope.max().x, 4.0);
        assert_eq!(envelope.max().y, 3.0);
    }
}
