//! Facade crate for the geocatalog workspace.
//!
//! This crate re-exports the core catalog types and exposes the import
//! pipeline and HTTP surface behind feature flags.

#![forbid(unsafe_code)]

pub use geocatalog_core::{
    EntityKind, EntityType, GeoEntity, GeoObject, GeoObjectError, GeoStore, GeometryFormatError,
    GeometryKind, IdentityPolicy, Properties, ScalarValue, StoreGeometry, ValidationError,
    geometry, registry, resolve,
};

#[cfg(feature = "import")]
pub use geocatalog_data::{
    ImportError, ImportReport, SourceOutcome, SourceReport, SourceSpec, default_sources, run_import,
};

#[cfg(feature = "server")]
pub use geocatalog_server::{AppState, ServerConfig, ServerError, router, serve};
