//! Failures raised by the CRUD engine and bulk writer.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    geometry::GeometryFormatError,
    payload::ValidationError,
    registry::{EntityKind, UnknownEntityType},
    store::SchemaError,
};

/// Error returned by [`crate::GeoStore`] operations.
#[derive(Debug, Error)]
pub enum GeoObjectError {
    /// The type key names no registered entity type.
    #[error(transparent)]
    UnknownType(#[from] UnknownEntityType),
    /// No row with the given id exists.
    #[error("{entity} object {id} not found")]
    NotFound {
        /// Entity type searched.
        entity: EntityKind,
        /// Requested identity.
        id: i64,
    },
    /// An insert collided with an existing identity or unique column.
    #[error("{entity} object conflicts with an existing row: {detail}")]
    Conflict {
        /// Entity type written.
        entity: EntityKind,
        /// What collided.
        detail: String,
    },
    /// The payload broke the entity's Create or Update shape.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A stored geometry could not be decoded.
    #[error("stored {entity} object {id} has an unreadable geometry")]
    CorruptGeometry {
        /// Entity type read.
        entity: EntityKind,
        /// Row identity.
        id: i64,
        /// Decoder failure.
        #[source]
        source: GeometryFormatError,
    },
    /// A stored properties blob was not a JSON object.
    #[error("stored {entity} object {id} has unreadable properties")]
    CorruptProperties {
        /// Entity type read.
        entity: EntityKind,
        /// Row identity.
        id: i64,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A typed struct did not match the row's projection.
    #[error("failed to reshape {entity} projection")]
    Projection {
        /// Entity type read.
        entity: EntityKind,
        /// Serde failure.
        #[source]
        source: serde_json::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}")]
    Open {
        /// Database location.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Provisioning or checking the schema failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A statement failed.
    #[error("failed to {operation}")]
    Store {
        /// Operation being performed.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
}

impl GeoObjectError {
    /// Whether the failure was caused by the request rather than the store.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownType(_) | Self::NotFound { .. } | Self::Conflict { .. } | Self::Validation(_)
        )
    }
}

pub(crate) fn store_error(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> GeoObjectError {
    move |source| GeoObjectError::Store { operation, source }
}
