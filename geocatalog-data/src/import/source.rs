//! Reading GeoJSON feature collections from disk.

use std::io::{self, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use geojson::JsonValue;
use thiserror::Error;

use super::report::SourceOutcome;
use crate::fs::open_utf8_file;

/// Why a source file yielded no features.
#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("failed to open {path}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} is not a feature collection: {reason}")]
    Shape {
        path: Utf8PathBuf,
        reason: &'static str,
    },
}

impl SourceError {
    pub(crate) fn outcome(&self) -> SourceOutcome {
        match self {
            Self::Open { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                SourceOutcome::Missing
            }
            Self::Open { .. } => SourceOutcome::Failed,
            Self::Parse { source, .. } if source.is_io() => SourceOutcome::Failed,
            Self::Parse { .. } | Self::Shape { .. } => SourceOutcome::Malformed,
        }
    }
}

/// Load the `features` array of the collection at `path`.
///
/// A document without a `features` key yields no features.
pub(crate) fn read_features(path: &Utf8Path) -> Result<Vec<JsonValue>, SourceError> {
    let file = open_utf8_file(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let document: JsonValue =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let JsonValue::Object(mut root) = document else {
        return Err(SourceError::Shape {
            path: path.to_path_buf(),
            reason: "top-level value is not an object",
        });
    };
    match root.remove("features") {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(features)) => Ok(features),
        Some(_) => Err(SourceError::Shape {
            path: path.to_path_buf(),
            reason: "`features` is not an array",
        }),
    }
}
